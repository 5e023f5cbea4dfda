//! Terminal presentation of console records.

use colored::Colorize;
use sm3patch_render::{ConsoleRecord, RecordLevel};

pub fn print_record(record: ConsoleRecord) {
    let text = record.text;
    match record.level {
        RecordLevel::Banner => println!("{}", text.bold()),
        RecordLevel::Info | RecordLevel::Output => println!("{text}"),
        RecordLevel::Warn => println!("{}", text.yellow()),
        RecordLevel::Error => println!("{}", text.red()),
    }
}

/// `ERROR: <message>` in red.
pub fn print_error(message: impl std::fmt::Display) {
    println!("{}", format!("ERROR: {message}").red());
}
