//! Command grammar, context, and response rendering for the CodeAgent webhook bot.
//! This crate holds the pure, side-effect free pieces of command processing;
//! dispatch and collaborator wiring live in `codeagent-runtime`.

pub mod activity_report;
pub mod code_task_render;
pub mod command_context;
pub mod command_grammar;
pub mod command_usage;
pub mod comment_text;
