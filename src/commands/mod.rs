mod plan;
mod start;
mod status;
mod stop;
mod switch;

pub use plan::{run_list, run_plan};
pub use start::run_start;
pub use status::run_status;
pub use stop::run_stop;
pub use switch::run_switch;

use devswitch::config::parse_duration_string;
use std::time::Duration;

/// Parse an optional `--timeout` value such as `30s` or `500ms`.
fn parse_timeout(value: Option<&str>) -> anyhow::Result<Option<Duration>> {
    value
        .map(|raw| {
            parse_duration_string(raw)
                .ok_or_else(|| anyhow::anyhow!("Invalid duration '{}' (expected e.g. 30s, 500ms, 1m)", raw))
        })
        .transpose()
}
