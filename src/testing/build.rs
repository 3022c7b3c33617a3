//! Fixture compilation

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command as TokioCommand;

use crate::common::config::BuildConfig;
use crate::common::{Error, Result};

use super::config::{BuildSpec, Language};

/// Compile a scenario's fixture into `out_dir`, returning the executable path
pub async fn build_fixture(
    spec: &BuildSpec,
    scenario_dir: &Path,
    out_dir: &Path,
    config: &BuildConfig,
) -> Result<PathBuf> {
    let first = spec
        .sources
        .first()
        .ok_or_else(|| Error::Config("build.sources must not be empty".to_string()))?;

    let language = match spec.language {
        Some(language) => language,
        None => Language::from_path(first).ok_or_else(|| {
            Error::Config(format!(
                "Cannot infer language of '{}'; set build.language",
                first.display()
            ))
        })?,
    };

    let compiler_name = match language {
        Language::C => &config.cc,
        Language::Cxx => &config.cxx,
    };
    let compiler =
        which::which(compiler_name).map_err(|_| Error::CompilerNotFound(compiler_name.clone()))?;

    let output = out_dir.join(&spec.output);
    let args = compiler_args(spec, &output, config);

    let rendered = format!("{} {}", compiler_name, args.join(" "));
    tracing::info!(command = %rendered, "Building fixture");

    let result = TokioCommand::new(&compiler)
        .args(&args)
        .current_dir(scenario_dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::BuildFailed {
            command: rendered.clone(),
            status: "failed to execute".to_string(),
            stderr: e.to_string(),
        })?;

    if !result.status.success() {
        return Err(Error::BuildFailed {
            command: rendered,
            status: result.status.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        });
    }

    Ok(output)
}

/// Argument list: configured flags, scenario flags, output, then sources
///
/// Sources stay relative; the compiler runs in the scenario directory.
fn compiler_args(spec: &BuildSpec, output: &Path, config: &BuildConfig) -> Vec<String> {
    let mut args: Vec<String> = config.flags.clone();
    args.extend(spec.flags.iter().cloned());
    args.push("-o".to_string());
    args.push(output.to_string_lossy().into_owned());
    args.extend(spec.sources.iter().map(|s| s.to_string_lossy().into_owned()));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(sources: &[&str]) -> BuildSpec {
        BuildSpec {
            sources: sources.iter().map(PathBuf::from).collect(),
            language: None,
            flags: vec!["-std=c++11".to_string()],
            output: "a.out".to_string(),
        }
    }

    #[test]
    fn test_compiler_args_order() {
        let args = compiler_args(
            &spec(&["main.cpp"]),
            Path::new("/tmp/out/a.out"),
            &BuildConfig::default(),
        );

        assert_eq!(
            args,
            vec![
                "-g",
                "-O0",
                "-std=c++11",
                "-o",
                "/tmp/out/a.out",
                "main.cpp",
            ]
        );
    }

    #[tokio::test]
    async fn test_builds_c_fixture() {
        let config = BuildConfig::default();
        if which::which(&config.cc).is_err() {
            eprintln!("Skipping test: no C compiler");
            return;
        }

        let src_dir = tempfile::tempdir().unwrap();
        std::fs::write(src_dir.path().join("main.c"), "int main(void) { return 0; }\n").unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let spec = BuildSpec {
            sources: vec![PathBuf::from("main.c")],
            language: None,
            flags: Vec::new(),
            output: "fixture".to_string(),
        };

        let exe = build_fixture(&spec, src_dir.path(), out_dir.path(), &config)
            .await
            .unwrap();

        assert_eq!(exe, out_dir.path().join("fixture"));
        assert!(exe.is_file());
    }

    #[tokio::test]
    async fn test_empty_sources_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_fixture(&spec(&[]), dir.path(), dir.path(), &BuildConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            cxx: "no-such-compiler-for-crashprobe".to_string(),
            ..Default::default()
        };
        let err = build_fixture(&spec(&["main.cpp"]), dir.path(), dir.path(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CompilerNotFound(name) if name == "no-such-compiler-for-crashprobe"));
    }
}
