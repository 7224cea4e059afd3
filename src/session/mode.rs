//! Server mode and the UI projection derived from it.

/// Operational state reported by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Auto,
    Executing,
    SingleTask,
    SortingTask,
    Offline,
}

impl Mode {
    /// Parse the wire string. Unknown strings yield `None`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim() {
            "IDLE" => Some(Mode::Idle),
            "AUTO" => Some(Mode::Auto),
            "EXECUTING" => Some(Mode::Executing),
            "SINGLE_TASK" => Some(Mode::SingleTask),
            "SORTING_TASK" => Some(Mode::SortingTask),
            "OFFLINE" => Some(Mode::Offline),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Auto => "AUTO",
            Mode::Executing => "EXECUTING",
            Mode::SingleTask => "SINGLE_TASK",
            Mode::SortingTask => "SORTING_TASK",
            Mode::Offline => "OFFLINE",
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Mode::Auto | Mode::Executing | Mode::SingleTask | Mode::SortingTask
        )
    }
}

/// Color family a renderer should use for an affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Danger,
    Warning,
    Muted,
}

/// What Enter does in the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendAffordance {
    Send,
    Interrupt,
}

/// Everything the renderer needs to know about the current mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeProjection {
    pub primary_label: &'static str,
    pub primary_tone: Tone,
    pub status_label: &'static str,
    pub status_tone: Tone,
    pub link_badge: &'static str,
    pub link_tone: Tone,
    pub ai_badge: &'static str,
    pub ai_tone: Tone,
    pub input_enabled: bool,
    pub placeholder: &'static str,
    pub send: SendAffordance,
}

impl ModeProjection {
    /// Pure function of the busy flag, so applying it twice is the same as once.
    pub fn for_mode(mode: Mode) -> Self {
        if mode.is_busy() {
            Self {
                primary_label: "STOP",
                primary_tone: Tone::Danger,
                status_label: "SYSTEM BUSY",
                status_tone: Tone::Danger,
                link_badge: "WORKING",
                link_tone: Tone::Warning,
                ai_badge: "AI LOCKED",
                ai_tone: Tone::Muted,
                input_enabled: false,
                placeholder: "System executing, AI locked...",
                send: SendAffordance::Interrupt,
            }
        } else {
            Self {
                primary_label: "START AUTO SORT",
                primary_tone: Tone::Success,
                status_label: "SYSTEM READY",
                status_tone: Tone::Success,
                link_badge: "ONLINE",
                link_tone: Tone::Success,
                ai_badge: "AI ACTIVE",
                ai_tone: Tone::Success,
                input_enabled: true,
                placeholder: "Type a command...",
                send: SendAffordance::Send,
            }
        }
    }
}
