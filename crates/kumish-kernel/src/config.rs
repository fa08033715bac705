//! Kernel configuration.

/// How a [`Kernel`](crate::Kernel) should behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Shell name, `$0` and the prefix of diagnostics.
    pub name: String,

    /// Reading commands from a user: SIGINT/SIGTERM/SIGTSTP are handled or
    /// ignored, background job numbers are announced, and SIGHUP is
    /// forwarded to jobs instead of to the whole process group.
    pub interactive: bool,

    /// Put each job in its own process group and move the terminal between
    /// them. Falls back to off when there is no controlling terminal.
    pub job_control: bool,

    /// Send SIGHUP to jobs not marked nohup when the shell exits normally.
    pub hup_on_exit: bool,

    /// Started as a login shell; `suspend` then needs `-f`.
    pub login: bool,

    /// Search path for commands instead of `$PATH`.
    pub path_override: Option<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::non_interactive()
    }
}

impl KernelConfig {
    /// A shell talking to a user at a terminal, with job control.
    pub fn interactive() -> Self {
        Self {
            name: "kumish".to_string(),
            interactive: true,
            job_control: true,
            hup_on_exit: false,
            login: false,
            path_override: None,
        }
    }

    /// A shell running a script or `-c` string.
    pub fn non_interactive() -> Self {
        Self {
            name: "kumish".to_string(),
            interactive: false,
            job_control: false,
            hup_on_exit: false,
            login: false,
            path_override: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_job_control(mut self, job_control: bool) -> Self {
        self.job_control = job_control;
        self
    }

    pub fn with_hup_on_exit(mut self, hup_on_exit: bool) -> Self {
        self.hup_on_exit = hup_on_exit;
        self
    }

    pub fn with_login(mut self, login: bool) -> Self {
        self.login = login;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path_override = Some(path.into());
        self
    }
}
