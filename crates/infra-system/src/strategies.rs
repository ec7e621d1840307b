// Concrete guard strategies
//
// POSIX shells run the code with `-c`. Windows interpreters are located under
// %SystemRoot% in the directory that yields the requested word size.

use scriptguard_core::application::constants::PROCESSOR_ARCHITECTURE_VAR;
use scriptguard_core::domain::{Architecture, Node, ScriptUnit};
use scriptguard_core::port::{ensure_architecture, GuardStrategy, ProcessSpec};
use scriptguard_core::Result;

const DEFAULT_SYSTEM_ROOT: &str = r"C:\Windows";

/// Export the word-size marker for units pinned to an architecture.
/// An explicit value in the unit's environment wins.
fn export_architecture_marker(spec: &mut ProcessSpec, unit: &ScriptUnit) {
    if let Some(architecture) = unit.target_architecture() {
        spec.env
            .entry(PROCESSOR_ARCHITECTURE_VAR.to_string())
            .or_insert_with(|| architecture.processor_marker().to_string());
    }
}

/// `/bin/sh -c <code>` (identifier `script`)
#[derive(Debug, Clone)]
pub struct PosixShell {
    interpreter: String,
}

impl PosixShell {
    pub fn new() -> Self {
        Self::with_interpreter("/bin/sh")
    }

    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for PosixShell {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardStrategy for PosixShell {
    fn name(&self) -> &str {
        "script"
    }

    fn build_invocation(&self, unit: &ScriptUnit, node: &Node) -> Result<ProcessSpec> {
        ensure_architecture(unit, node)?;
        let mut spec = ProcessSpec::for_unit(
            unit,
            self.interpreter.clone(),
            vec!["-c".to_string(), unit.command().to_string()],
        );
        export_architecture_marker(&mut spec, unit);
        Ok(spec)
    }
}

/// `bash -c <code>` (identifier `bash`)
#[derive(Debug, Clone)]
pub struct Bash {
    interpreter: String,
}

impl Bash {
    pub fn new() -> Self {
        Self {
            interpreter: "bash".to_string(),
        }
    }
}

impl Default for Bash {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardStrategy for Bash {
    fn name(&self) -> &str {
        "bash"
    }

    fn build_invocation(&self, unit: &ScriptUnit, node: &Node) -> Result<ProcessSpec> {
        ensure_architecture(unit, node)?;
        let mut spec = ProcessSpec::for_unit(
            unit,
            self.interpreter.clone(),
            vec![
                "--noprofile".to_string(),
                "--norc".to_string(),
                "-c".to_string(),
                unit.command().to_string(),
            ],
        );
        export_architecture_marker(&mut spec, unit);
        Ok(spec)
    }
}

/// Where Windows binaries of a given word size live
#[derive(Debug, Clone)]
pub struct WindowsSystemDirs {
    system_root: String,
    agent_architecture: Architecture,
}

impl WindowsSystemDirs {
    /// From %SystemRoot% and the agent's own word size
    pub fn detect() -> Self {
        Self {
            system_root: std::env::var("SystemRoot")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_ROOT.to_string()),
            agent_architecture: Architecture::of_current_process(),
        }
    }

    pub fn new(system_root: impl Into<String>, agent_architecture: Architecture) -> Self {
        Self {
            system_root: system_root.into(),
            agent_architecture,
        }
    }

    /// System directory that gives a process of `requested` word size.
    ///
    /// A 32-bit agent sees System32 redirected to SysWOW64, so 64-bit binaries
    /// are reached through `sysnative`; a 64-bit agent reaches 32-bit binaries
    /// through `SysWOW64`.
    pub fn system_dir(&self, node: &Node, requested: Option<Architecture>) -> String {
        let agent_is_64 = self.agent_architecture == Architecture::X86_64;
        let subdir = match requested {
            Some(Architecture::X86_64) if !agent_is_64 => "sysnative",
            Some(Architecture::I386) if agent_is_64 && node.is_x86_64() => "SysWOW64",
            _ => "System32",
        };
        format!("{}\\{}", self.system_root.trim_end_matches('\\'), subdir)
    }
}

/// Windows PowerShell (identifier `powershell_script`)
#[derive(Debug, Clone)]
pub struct PowerShell {
    dirs: WindowsSystemDirs,
}

impl PowerShell {
    pub fn new() -> Self {
        Self::with_dirs(WindowsSystemDirs::detect())
    }

    pub fn with_dirs(dirs: WindowsSystemDirs) -> Self {
        Self { dirs }
    }

    /// Make the process exit status reflect the script: a non-zero
    /// $LASTEXITCODE wins, otherwise a failed last statement exits 1.
    pub fn wrap(code: &str) -> String {
        format!(
            "$global:LASTEXITCODE = $null\n\
             {}\n\
             $scriptguardStatus = $?\n\
             if ($LASTEXITCODE -ne $null -and $LASTEXITCODE -ne 0) {{ exit $LASTEXITCODE }}\n\
             if (-not $scriptguardStatus) {{ exit 1 }}\n\
             exit 0",
            code
        )
    }
}

impl Default for PowerShell {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardStrategy for PowerShell {
    fn name(&self) -> &str {
        "powershell_script"
    }

    fn build_invocation(&self, unit: &ScriptUnit, node: &Node) -> Result<ProcessSpec> {
        ensure_architecture(unit, node)?;
        let interpreter = format!(
            "{}\\WindowsPowerShell\\v1.0\\powershell.exe",
            self.dirs.system_dir(node, unit.target_architecture())
        );
        let args = [
            "-NoLogo",
            "-NonInteractive",
            "-NoProfile",
            "-ExecutionPolicy",
            "Bypass",
            "-InputFormat",
            "None",
            "-Command",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(Self::wrap(unit.command())))
        .collect();

        Ok(ProcessSpec::for_unit(unit, interpreter, args))
    }
}

/// cmd.exe (identifier `batch`)
#[derive(Debug, Clone)]
pub struct Batch {
    dirs: WindowsSystemDirs,
}

impl Batch {
    pub fn new() -> Self {
        Self::with_dirs(WindowsSystemDirs::detect())
    }

    pub fn with_dirs(dirs: WindowsSystemDirs) -> Self {
        Self { dirs }
    }
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardStrategy for Batch {
    fn name(&self) -> &str {
        "batch"
    }

    fn build_invocation(&self, unit: &ScriptUnit, node: &Node) -> Result<ProcessSpec> {
        ensure_architecture(unit, node)?;
        let interpreter = format!(
            "{}\\cmd.exe",
            self.dirs.system_dir(node, unit.target_architecture())
        );
        Ok(ProcessSpec::for_unit(
            unit,
            interpreter,
            vec!["/c".to_string(), unit.command().to_string()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptguard_core::domain::OsKind;
    use scriptguard_core::GuardError;
    use std::time::Duration;

    fn windows(machine: &str) -> Node {
        Node::new("win", OsKind::Windows, "windows", "6.3.9600", machine)
    }

    fn linux() -> Node {
        Node::new("lin", OsKind::Linux, "ubuntu", "22.04", "x86_64")
    }

    #[test]
    fn test_posix_shell_invocation() {
        let unit = ScriptUnit::new("u")
            .code("exit 0")
            .cwd("/tmp")
            .timeout(Duration::from_secs(2));

        let spec = PosixShell::new().build_invocation(&unit, &linux()).unwrap();

        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.args, vec!["-c".to_string(), "exit 0".to_string()]);
        assert_eq!(spec.cwd.as_deref(), Some("/tmp"));
        assert_eq!(spec.timeout, Some(Duration::from_secs(2)));
        assert!(!spec.env.contains_key(PROCESSOR_ARCHITECTURE_VAR));
    }

    #[test]
    fn test_posix_architecture_marker() {
        let unit = ScriptUnit::new("u").architecture(Architecture::I386);
        let spec = Bash::new().build_invocation(&unit, &linux()).unwrap();
        assert_eq!(spec.env[PROCESSOR_ARCHITECTURE_VAR], "X86");

        let mut env = std::collections::HashMap::new();
        env.insert(PROCESSOR_ARCHITECTURE_VAR.to_string(), "custom".to_string());
        let unit = ScriptUnit::new("u")
            .architecture(Architecture::X86_64)
            .environment(env);
        let spec = PosixShell::new().build_invocation(&unit, &linux()).unwrap();
        assert_eq!(spec.env[PROCESSOR_ARCHITECTURE_VAR], "custom");
    }

    #[test]
    fn test_system_dir_selection() {
        let agent64 = WindowsSystemDirs::new(r"C:\Windows", Architecture::X86_64);
        let agent32 = WindowsSystemDirs::new(r"C:\Windows\", Architecture::I386);
        let node64 = windows("x86_64");
        let node32 = windows("i686");

        assert_eq!(agent64.system_dir(&node64, None), r"C:\Windows\System32");
        assert_eq!(
            agent64.system_dir(&node64, Some(Architecture::I386)),
            r"C:\Windows\SysWOW64"
        );
        assert_eq!(
            agent64.system_dir(&node64, Some(Architecture::X86_64)),
            r"C:\Windows\System32"
        );
        assert_eq!(
            agent32.system_dir(&node64, Some(Architecture::X86_64)),
            r"C:\Windows\sysnative"
        );
        assert_eq!(
            agent32.system_dir(&node64, Some(Architecture::I386)),
            r"C:\Windows\System32"
        );
        assert_eq!(
            agent32.system_dir(&node32, Some(Architecture::I386)),
            r"C:\Windows\System32"
        );
    }

    #[test]
    fn test_powershell_invocation() {
        let strategy =
            PowerShell::with_dirs(WindowsSystemDirs::new(r"C:\Windows", Architecture::X86_64));
        let unit = ScriptUnit::new("u")
            .code("exit 37")
            .architecture(Architecture::I386);

        let spec = strategy.build_invocation(&unit, &windows("x86_64")).unwrap();

        assert_eq!(
            spec.program,
            r"C:\Windows\SysWOW64\WindowsPowerShell\v1.0\powershell.exe"
        );
        assert!(spec.args.contains(&"-NonInteractive".to_string()));
        let script = spec.args.last().unwrap();
        assert!(script.contains("exit 37"));
        assert!(script.starts_with("$global:LASTEXITCODE = $null"));
        assert!(script.ends_with("exit 0"));
    }

    #[test]
    fn test_windows_strategy_rejects_missing_architecture() {
        let strategy = Batch::with_dirs(WindowsSystemDirs::new(r"C:\Windows", Architecture::I386));
        let unit = ScriptUnit::new("u")
            .code("exit /b 0")
            .architecture(Architecture::X86_64);

        let err = strategy
            .build_invocation(&unit, &windows("i686"))
            .unwrap_err();
        assert!(matches!(err, GuardError::ArchitectureUnsupported { .. }));
    }

    #[test]
    fn test_batch_invocation() {
        let strategy = Batch::with_dirs(WindowsSystemDirs::new(r"D:\Win", Architecture::X86_64));
        let spec = strategy
            .build_invocation(&ScriptUnit::new("u").code("exit /b 1"), &windows("x86_64"))
            .unwrap();

        assert_eq!(spec.program, r"D:\Win\System32\cmd.exe");
        assert_eq!(spec.args, vec!["/c".to_string(), "exit /b 1".to_string()]);
    }
}
