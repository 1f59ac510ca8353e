use crate::vehicle::VehicleState;
use core::fmt::Write as _;
use heapless::String;

pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
pub const SAVE_CURSOR: &str = "\x1b[s";
pub const CURSOR_HOME: &str = "\x1b[H";
pub const CLEAR_TO_EOL: &str = "\x1b[K";
pub const RESTORE_CURSOR: &str = "\x1b[u";

pub const STATUS_CAPACITY: usize = 96;

/// The bare status text, without control sequences.
pub fn status_line(state: &VehicleState) -> String<STATUS_CAPACITY> {
    let mut line = String::new();
    let _ = write!(
        line,
        "SPD: {:6.1} km/h | RPM: {:5} | TEMP: {:5.1} C   ",
        state.speed_kph, state.engine_rpm, state.coolant_temp_c
    );
    line
}

/// Status line wrapped so it lands on the top row and the cursor returns
/// to wherever the operator is typing.
pub fn render(state: &VehicleState) -> String<{ STATUS_CAPACITY + 16 }> {
    let mut out = String::new();
    let _ = out.push_str(SAVE_CURSOR);
    let _ = out.push_str(CURSOR_HOME);
    let _ = out.push_str(&status_line(state));
    let _ = out.push_str(CLEAR_TO_EOL);
    let _ = out.push_str(RESTORE_CURSOR);
    out
}
