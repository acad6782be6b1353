//! Best-effort recovery of typed records from agent stdout.
//!
//! Agent output is untrusted prose that may wrap a JSON object in markdown
//! fences or surround it with commentary. Extraction never fails loudly: a
//! missing or malformed object yields `None`, and a field of the wrong JSON
//! type is simply absent from the result.

pub mod idea;
pub mod json;
pub mod ticket;

pub use idea::{ExtractedIdea, extract_idea_json_from_stdout};
pub use json::extract_json_object;
pub use ticket::{ExtractedTicket, extract_ticket_json_from_stdout};
