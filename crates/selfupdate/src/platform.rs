//! Platform-aware rendering of artifact locations.
//!
//! A location such as `https://example.com/app-{{.OS}}-{{.Arch}}{{.Ext}}` is
//! rendered once, when a source is built, into the concrete URL or object key
//! for the running platform. Recognised fields:
//!
//! * `{{.OS}}`: operating system name (`linux`, `macos`, `windows`, ...)
//! * `{{.Arch}}`: CPU architecture (`x86_64`, `aarch64`, ...)
//! * `{{.Ext}}`: executable suffix, `.exe` on Windows and empty elsewhere
//! * `{{.Executable}}`: file name of the running binary without `Ext`
//!
//! `OS` and `Arch` are Rust's `std::env::consts` names. Artifacts published
//! under Go toolchain names must be renamed (or the template written with
//! literal names): `macos` is Go's `darwin`, `x86_64` is `amd64`, `aarch64` is
//! `arm64` and `x86` is `386`. `linux` and `windows` are the same in both.

use crate::executable::ExecutableResolver;
use crate::logger::Logger;
use std::path::Path;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Errors raised while rendering a location template.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` was never closed.
    #[error("unclosed action starting at byte {0}")]
    Unclosed(usize),
    /// An action was not a field reference such as `.OS`.
    #[error("malformed action {0:?}")]
    Malformed(String),
    /// An action referenced a field that does not exist.
    #[error("unknown field {0:?}")]
    UnknownField(String),
}

/// Runtime facts substituted into location templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system, as in `std::env::consts::OS`.
    pub os: String,
    /// CPU architecture, as in `std::env::consts::ARCH`.
    pub arch: String,
    /// Executable suffix including the dot, empty when there is none.
    pub ext: String,
    /// Running binary's file name without `ext`.
    pub executable: String,
}

impl Platform {
    /// Facts for the running process. The executable name comes from the
    /// resolver and falls back to the invocation name when resolution failed.
    pub fn current(resolver: &ExecutableResolver) -> Self {
        let ext = std::env::consts::EXE_SUFFIX;
        let name = match resolver.real_path() {
            Ok(real) => file_name(real),
            Err(_) => std::env::args_os()
                .next()
                .map(|arg0| file_name(Path::new(&arg0)))
                .unwrap_or_default(),
        };

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            ext: ext.to_string(),
            executable: strip_suffix(&name, ext).to_string(),
        }
    }

    /// Substitute every field reference in `template`.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let body_start = start + OPEN.len();
            let end = rest[body_start..]
                .find(CLOSE)
                .ok_or(TemplateError::Unclosed(offset + start))?;
            let action = &rest[body_start..body_start + end];
            out.push_str(self.field(action)?);

            let consumed = body_start + end + CLOSE.len();
            offset += consumed;
            rest = &rest[consumed..];
        }
        out.push_str(rest);

        Ok(out)
    }

    fn field(&self, action: &str) -> Result<&str, TemplateError> {
        let name = action
            .trim()
            .strip_prefix('.')
            .filter(|name| !name.is_empty() && name.chars().all(is_ident_char))
            .ok_or_else(|| TemplateError::Malformed(action.to_string()))?;

        match name {
            "OS" => Ok(self.os.as_str()),
            "Arch" => Ok(self.arch.as_str()),
            "Ext" => Ok(self.ext.as_str()),
            "Executable" => Ok(self.executable.as_str()),
            other => Err(TemplateError::UnknownField(other.to_string())),
        }
    }
}

/// Render `template` for `platform`, returning it unchanged if it cannot be
/// rendered. A broken template then surfaces as a not-found error from the
/// backend instead of failing configuration.
pub fn render_location(template: &str, platform: &Platform, logger: &dyn Logger) -> String {
    match platform.render(template) {
        Ok(rendered) => rendered,
        Err(err) => {
            logger.debug(format_args!(
                "location template {template:?} left unrendered: {err}"
            ));
            template.to_string()
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn strip_suffix<'a>(name: &'a str, ext: &str) -> &'a str {
    if ext.is_empty() {
        return name;
    }
    name.strip_suffix(ext).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NoopLogger;
    use std::fmt;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogger {
        debug: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn debug(&self, args: fmt::Arguments<'_>) {
            self.debug.lock().unwrap().push(args.to_string());
        }
    }

    fn windows() -> Platform {
        Platform {
            os: "windows".into(),
            arch: "x86_64".into(),
            ext: ".exe".into(),
            executable: "nomad".into(),
        }
    }

    #[test]
    fn leaves_plain_locations_alone() {
        let platform = Platform::current(ExecutableResolver::process());
        let plain = "http://localhost/nomad-windows-amd64.exe";
        let once = render_location(plain, &platform, &NoopLogger);
        let twice = render_location(&once, &platform, &NoopLogger);
        assert_eq!(once, plain);
        assert_eq!(twice, plain);
    }

    #[test]
    fn substitutes_runtime_platform() {
        let platform = Platform::current(ExecutableResolver::process());
        let template = "host/app-{{.OS}}-{{.Arch}}{{.Ext}}";
        let rendered = render_location(template, &platform, &NoopLogger);

        let expected = format!(
            "host/app-{}-{}{}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            std::env::consts::EXE_SUFFIX
        );
        assert_eq!(rendered, expected);
        assert_eq!(platform.ext.is_empty(), !cfg!(windows));
    }

    #[test]
    fn substitutes_executable_and_tolerates_spaces() {
        let rendered = windows()
            .render("bucket/{{ .Executable }}/{{.OS}}-{{.Arch}}{{.Ext}}")
            .unwrap();
        assert_eq!(rendered, "bucket/nomad/windows-x86_64.exe");
    }

    #[test]
    fn current_executable_has_no_suffix() {
        let platform = Platform::current(ExecutableResolver::process());
        assert!(!platform.executable.is_empty());
        if !platform.ext.is_empty() {
            assert!(!platform.executable.ends_with(&platform.ext));
        }
    }

    #[test]
    fn executable_falls_back_to_invocation_name() {
        let broken = ExecutableResolver::with_locator(|| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "unavailable"))
        });
        let platform = Platform::current(&broken);
        let arg0 = std::env::args_os().next().unwrap();
        let expected = file_name(Path::new(&arg0));
        assert_eq!(platform.executable, strip_suffix(&expected, &platform.ext));
    }

    #[test]
    fn strips_only_a_trailing_suffix() {
        assert_eq!(strip_suffix("tool.exe", ".exe"), "tool");
        assert_eq!(strip_suffix("tool", ".exe"), "tool");
        assert_eq!(strip_suffix("tool.exe", ""), "tool.exe");
    }

    #[test]
    fn reports_template_errors() {
        let platform = windows();
        assert_eq!(platform.render("a/{{.OS"), Err(TemplateError::Unclosed(2)));
        assert_eq!(
            platform.render("a/{{.Version}}"),
            Err(TemplateError::UnknownField("Version".into()))
        );
        assert_eq!(
            platform.render("a/{{OS}}"),
            Err(TemplateError::Malformed("OS".into()))
        );
        assert_eq!(platform.render("a/{{}}"), Err(TemplateError::Malformed(String::new())));
    }

    #[test]
    fn broken_templates_fall_back_with_a_diagnostic() {
        let logger = RecordingLogger::default();
        let template = "http://localhost/{{.Version}}/app";
        let rendered = render_location(template, &windows(), &logger);

        assert_eq!(rendered, template);
        let messages = logger.debug.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Version"));
    }
}
