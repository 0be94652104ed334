//! Pure, allocation-light compilers and evaluators shared by every service
//! that touches audit/activity/event records: time parsing (C1), the
//! filter expression language (C2), the policy match/template engine (C3),
//! the opaque pagination cursor (C4), and the facet engine (C6). None of
//! this module talks to the database or the bus — those live in
//! `telemetry-store`/`telemetry-bus` and call into this crate.

pub mod cursor;
pub mod facets;
pub mod filter;
pub mod policy;
pub mod selector;
pub mod time;

pub use filter::{CompiledFilter, RecordType};
pub use policy::{CompiledPolicy, PolicyCache, PolicyIndex};
