#![allow(dead_code)]

use std::path::Path;

use autoapply::config::{
    ConfigFile, OneOrMany, RawAuthentication, RawCall, RawCommand, RawConfigFile, RawInit,
    RawLoop, RawServer, RawSleep, RawUser,
};
use autoapply::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    loops: Vec<RawLoop>,
    calls: Vec<RawCall>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
            loops: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn with_init(mut self, init: RawInit) -> Self {
        self.config.init = Some(init);
        self
    }

    pub fn with_loop(mut self, l: RawLoop) -> Self {
        self.loops.push(l);
        self
    }

    pub fn with_call(mut self, call: RawCall) -> Self {
        self.calls.push(call);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config
            .server
            .get_or_insert_with(RawServer::default)
            .port = Some(port);
        self
    }

    pub fn with_server_enabled(mut self, enabled: bool) -> Self {
        self.config
            .server
            .get_or_insert_with(RawServer::default)
            .enabled = Some(enabled);
        self
    }

    pub fn raw(mut self) -> RawConfigFile {
        if !self.loops.is_empty() {
            self.config.loops = Some(OneOrMany::Many(self.loops));
        }
        if !self.calls.is_empty() {
            self.config.calls = Some(OneOrMany::Many(self.calls));
        }
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.raw())
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn shell(cmd: &str) -> RawCommand {
    RawCommand::Shell(cmd.to_string())
}

/// Builder for the `init` section.
pub struct InitBuilder {
    init: RawInit,
}

impl InitBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            init: RawInit {
                commands: vec![shell(cmd)],
                ..RawInit::default()
            },
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.init.commands.push(shell(cmd));
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.init.cwd = Some(dir.display().to_string());
        self
    }

    pub fn onerror(mut self, value: &str) -> Self {
        self.init.onerror = Some(value.to_string());
        self
    }

    pub fn build(self) -> RawInit {
        self.init
    }
}

/// Builder for one `loop` entry.
pub struct LoopBuilder {
    l: RawLoop,
}

impl LoopBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            l: RawLoop {
                commands: vec![shell(cmd)],
                ..RawLoop::default()
            },
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.l.commands.push(shell(cmd));
        self
    }

    pub fn raw_command(mut self, cmd: RawCommand) -> Self {
        self.l.commands.push(cmd);
        self
    }

    pub fn sleep(mut self, secs: f64) -> Self {
        self.l.sleep = Some(RawSleep::Seconds(secs));
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.l.cwd = Some(dir.display().to_string());
        self
    }

    pub fn onerror(mut self, value: &str) -> Self {
        self.l.onerror = Some(value.to_string());
        self
    }

    pub fn build(self) -> RawLoop {
        self.l
    }
}

/// Builder for one `call` entry.
pub struct CallBuilder {
    call: RawCall,
}

impl CallBuilder {
    pub fn new(path: &str, cmd: &str) -> Self {
        Self {
            call: RawCall {
                path: Some(path.to_string()),
                commands: vec![shell(cmd)],
                ..RawCall::default()
            },
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.call.commands.push(shell(cmd));
        self
    }

    pub fn methods(mut self, methods: &[&str]) -> Self {
        self.call.methods = Some(methods.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn stream(mut self, val: bool) -> Self {
        self.call.stream = Some(val);
        self
    }

    pub fn onerror(mut self, value: &str) -> Self {
        self.call.onerror = Some(value.to_string());
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.call.cwd = Some(dir.display().to_string());
        self
    }

    pub fn user(mut self, username: &str, password: &str) -> Self {
        let user = RawUser {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        match &mut self.call.authentication {
            Some(RawAuthentication::Users(users)) => users.push(user),
            _ => self.call.authentication = Some(RawAuthentication::Users(vec![user])),
        }
        self
    }

    pub fn build(self) -> RawCall {
        self.call
    }
}
