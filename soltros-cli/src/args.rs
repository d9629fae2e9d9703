//! Argument-cardinality policy, applied uniformly to every verb
//!
//! Missing required argument: fatal, with a usage line naming the verb.
//! Surplus arguments: a warning naming the ignored extras, then the
//! command proceeds on the first one.

use soltros_core::{Result, SoltrosError};
use tracing::warn;

pub fn require_one<'a>(verb: &str, placeholder: &str, args: &'a [String]) -> Result<&'a str> {
    match args.first() {
        Some(first) => {
            warn_extras(verb, &args[1..]);
            Ok(first)
        }
        None => Err(SoltrosError::validation(format!(
            "'{verb}' requires an argument\nusage: soltros {verb} {placeholder}"
        ))),
    }
}

pub fn at_most_one<'a>(verb: &str, args: &'a [String]) -> Option<&'a str> {
    if args.len() > 1 {
        warn_extras(verb, &args[1..]);
    }
    args.first().map(String::as_str)
}

pub fn expect_none(verb: &str, args: &[String]) {
    warn_extras(verb, args);
}

fn warn_extras(verb: &str, extras: &[String]) {
    if !extras.is_empty() {
        warn!(
            "ignoring extra arguments to '{verb}': {}",
            extras.join(" ")
        );
    }
}
