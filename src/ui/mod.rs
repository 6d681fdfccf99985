//! Terminal output with plain-text fallback
//!
//! Interactive terminals get `cliclack` log lines, spinners and an
//! `indicatif` bar for long hashes. CI and piped output get plain
//! `[OK]`/`[WARN]` prefixed lines instead.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, remark, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::{ByteProgress, TaskSpinner};
pub use prompts::confirm;
