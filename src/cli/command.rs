/// Coolant temperature requested by `veh cool-hot`. `force` clamps it to
/// the top of the physical range.
pub const OVERHEAT_TEMP_C: f32 = 115.0;

pub const PROMPT: &str = "> ";

pub const HELP_TEXT: &str = concat!(
    "\r\nCommands:\r\n",
    "  help          - show this help\r\n",
    "  veh speed X   - set target speed to X km/h\r\n",
    "  veh cool-hot  - inject coolant overheat\r\n",
    "  log on        - enable CAN RX logging\r\n",
    "  log off       - disable CAN RX logging\r\n> ",
);

pub const EMPTY_LINE_RESPONSE: &str = "\r\n> ";
pub const OVERHEAT_RESPONSE: &str = "\r\nInjected: coolant overheat\r\n> ";
pub const LOGGING_ON_RESPONSE: &str = "\r\nCAN RX logging: ON\r\n> ";
pub const LOGGING_OFF_RESPONSE: &str = "\r\nCAN RX logging: OFF\r\n> ";
pub const UNKNOWN_RESPONSE: &str = "\r\nUnknown command. Try 'help'.\r\n> ";

const SPEED_PREFIX: &str = "veh speed ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CliCommand<'a> {
    Help,
    SetSpeed(f32),
    /// `veh speed` followed by text that is not a number.
    BadSpeed(&'a str),
    CoolantOverheat,
    CanLogging(bool),
    Unknown,
}

impl<'a> CliCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line {
            "help" | "h" => return CliCommand::Help,
            "veh cool-hot" => return CliCommand::CoolantOverheat,
            "log on" => return CliCommand::CanLogging(true),
            "log off" => return CliCommand::CanLogging(false),
            _ => {}
        }

        if let Some(arg) = line.strip_prefix(SPEED_PREFIX) {
            let arg = arg.trim();
            return match arg.parse::<f32>() {
                Ok(speed) => CliCommand::SetSpeed(speed),
                Err(_) => CliCommand::BadSpeed(arg),
            };
        }

        CliCommand::Unknown
    }
}
