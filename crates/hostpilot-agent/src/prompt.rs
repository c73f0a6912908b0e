//! System prompt loading.
//!
//! The prompt lives in a plain text file so operators can edit it. On first
//! run the built-in prompt is written there.

use std::path::Path;

use tracing::{info, warn};

/// Built-in system prompt for a host-administration agent.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI assistant with full access to an Ubuntu Linux server. You have complete control and can execute any command.

**YOUR CAPABILITIES:**
- Execute any bash command using the run_bash tool
- Read and write files anywhere on the system
- Install packages with apt (use sudo)
- Manage services with systemctl (use sudo)
- Search for files and content
- Full sudo access (passwordless)

**YOUR ENVIRONMENT:**
- Ubuntu Linux server
- Full PATH: /usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin
- You have root-level access via sudo

**HOW TO OPERATE:**
1. User asks you to do something
2. You use tools to accomplish it
3. Always use sudo for system operations (apt, systemctl, etc.)
4. Always verify your actions worked by checking output and exit codes
5. Be helpful and proactive - if something fails, try to fix it
6. You are running on a real Ubuntu server with full capabilities

**YOUR RESPONSIBILITIES:**
- Execute commands directly - don't ask for permission
- Use sudo when needed (apt install, systemctl, etc.)
- When executing commands, check the output and exit codes to ensure success
- If something requires elevated privileges, use sudo
- Be direct and efficient

**IMPORTANT:** If a sudo command fails because passwordless sudo isn't configured, inform the user they need to configure passwordless sudo or run the command manually."#;

/// Read the prompt at `path`, creating it from [`DEFAULT_SYSTEM_PROMPT`] if
/// missing. Unreadable or unwritable files fall back to the built-in prompt.
pub fn load_or_bootstrap(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(prompt) => {
            info!(path = %path.display(), "loaded system prompt");
            return prompt;
        }
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), error = %e, "cannot read system prompt, using built-in");
            return DEFAULT_SYSTEM_PROMPT.to_string();
        }
        Err(_) => {}
    }

    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|_| std::fs::write(path, DEFAULT_SYSTEM_PROMPT));
    match written {
        Ok(()) => info!(path = %path.display(), "created default system prompt"),
        Err(e) => warn!(path = %path.display(), error = %e, "cannot write default system prompt"),
    }
    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/system-prompt.txt");

        let prompt = load_or_bootstrap(&path);
        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_existing_prompt_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system-prompt.txt");
        std::fs::write(&path, "You manage a Raspberry Pi.").unwrap();

        assert_eq!(load_or_bootstrap(&path), "You manage a Raspberry Pi.");
    }

    #[test]
    fn test_default_prompt_mentions_tools() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("run_bash"));
    }
}
