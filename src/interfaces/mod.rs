// User-facing surfaces: one-shot CLI commands and the interactive shell,
// both rendering through `presentation`.
pub mod cli;
pub mod presentation;
pub mod shell;
