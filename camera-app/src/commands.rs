//! Keyboard input to engine commands.

use camera_ipc::SessionCommand;

/// What a line of input asks the front end to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Forward a command to the engine.
    Command(SessionCommand),

    /// Print the latest preview frame.
    Preview,

    /// Print the key bindings.
    Help,

    /// Leave the application.
    Quit,
}

/// Key bindings, shown on startup and on `h`.
pub const HELP: &str = "\
c  capture still image
r  start/stop recording
p  pause/resume recording
v  show latest preview frame
s  show state
h  help
q  quit";

/// Parse one line of input. Unknown input yields `None`.
pub fn parse_input(line: &str) -> Option<Input> {
    let input = match line.trim() {
        "c" | "capture" => Input::Command(SessionCommand::Capture),
        "r" | "record" => Input::Command(SessionCommand::ToggleRecording),
        "p" | "pause" => Input::Command(SessionCommand::TogglePause),
        "s" | "state" => Input::Command(SessionCommand::GetState),
        "v" | "preview" => Input::Preview,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}
