//! 配布物の起動スクリプト

use crate::error::Result;
use tera::{Context, Tera};

const UNIX_TEMPLATE: &str = r#"#!/bin/sh
#
# {{ app_name }} start script
#

APP_HOME=$(cd "$(dirname "$0")/.." && pwd -P)

CLASSPATH={% for jar in classpath %}$APP_HOME/lib/{{ jar }}{% if not loop.last %}:{% endif %}{% endfor %}

if [ -n "$JAVA_HOME" ]; then
    JAVACMD="$JAVA_HOME/bin/java"
else
    JAVACMD=java
fi

exec "$JAVACMD" $DEFAULT_JVM_OPTS $JAVA_OPTS ${{ opts_env }} -classpath "$CLASSPATH" {{ main_class }} "$@"
"#;

const WINDOWS_TEMPLATE: &str = r#"@rem
@rem {{ app_name }} start script
@rem
@if "%DEBUG%"=="" @echo off
setlocal

set APP_HOME=%~dp0..

set CLASSPATH={% for jar in classpath %}%APP_HOME%\lib\{{ jar }}{% if not loop.last %};{% endif %}{% endfor %}

if defined JAVA_HOME (
    set JAVA_EXE=%JAVA_HOME%\bin\java.exe
) else (
    set JAVA_EXE=java.exe
)

"%JAVA_EXE%" %DEFAULT_JVM_OPTS% %JAVA_OPTS% %{{ opts_env }}% -classpath "%CLASSPATH%" {{ main_class }} %*

endlocal
"#;

/// 起動スクリプト（unix, windows）
pub(crate) struct StartScripts {
    pub unix: String,
    pub windows: String,
}

impl StartScripts {
    pub(crate) fn render(app_name: &str, main_class: &str, classpath: &[String]) -> Result<Self> {
        let mut context = Context::new();
        context.insert("app_name", app_name);
        context.insert("main_class", main_class);
        context.insert("classpath", classpath);
        context.insert("opts_env", &opts_env_name(app_name));

        Ok(Self {
            unix: Tera::one_off(UNIX_TEMPLATE, &context, false)?,
            windows: Tera::one_off(WINDOWS_TEMPLATE, &context, false)?.replace('\n', "\r\n"),
        })
    }
}

/// `control-plane` -> `CONTROL_PLANE_OPTS`
fn opts_env_name(app_name: &str) -> String {
    let name: String = app_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_OPTS", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_unix_script() {
        let scripts = StartScripts::render(
            "control-plane",
            "org.eclipse.edc.boot.system.runtime.BaseRuntime",
            &["control-plane-0.1.0.jar".to_string(), "boot-0.7.0.jar".to_string()],
        )
        .unwrap();

        assert!(scripts.unix.starts_with("#!/bin/sh"));
        assert!(scripts.unix.contains(
            "CLASSPATH=$APP_HOME/lib/control-plane-0.1.0.jar:$APP_HOME/lib/boot-0.7.0.jar\n"
        ));
        assert!(scripts.unix.contains("$CONTROL_PLANE_OPTS"));
        assert!(
            scripts
                .unix
                .contains("org.eclipse.edc.boot.system.runtime.BaseRuntime \"$@\"")
        );
    }

    #[test]
    fn test_render_windows_script() {
        let scripts =
            StartScripts::render("app", "org.example.Main", &["a.jar".to_string(), "b.jar".to_string()])
                .unwrap();

        assert!(
            scripts
                .windows
                .contains("set CLASSPATH=%APP_HOME%\\lib\\a.jar;%APP_HOME%\\lib\\b.jar\r\n")
        );
        assert!(scripts.windows.contains("%APP_OPTS%"));
        assert!(!scripts.windows.contains("\r\r"));
    }

    #[test]
    fn test_opts_env_name() {
        assert_eq!(opts_env_name("control-plane"), "CONTROL_PLANE_OPTS");
        assert_eq!(opts_env_name("app.v2"), "APP_V2_OPTS");
    }
}
