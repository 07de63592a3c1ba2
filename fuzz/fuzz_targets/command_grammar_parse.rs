#![no_main]

use codeagent_commands::activity_report::parse_report_window_days;
use codeagent_commands::command_grammar::{recognize_command, CommandName, COMMAND_SIGIL};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);
    let Some(matched) = recognize_command(&body) else {
        return;
    };
    assert!(body.starts_with(COMMAND_SIGIL));
    assert_eq!(matched.args, matched.args.trim());
    assert!(!matched.args.contains('\n'));

    let command = matched
        .into_command()
        .expect("recognized keywords always map to a command");
    assert!(CommandName::ALL.contains(&command.name));
    if command.name == CommandName::Report {
        assert!(parse_report_window_days(&command.args) > 0);
    }
});
