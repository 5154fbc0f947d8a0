use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use launchpad_core::component::{
    Artifact, Builder, Component, Configurable, Deployment, Platform, Release, ReleaseManager,
    Role, Source,
};
use launchpad_core::config::{AppConfig, BuildConfig, Diagnostic, Diagnostics, EvalContext, OperationConfig};
use launchpad_core::datadir::ComponentDir;
use launchpad_core::domain::{BoxError, Payload};
use launchpad_core::invoke::{DynFunc, InvocationContext};
use launchpad_core::ports::Ui;
use launchpad_core::{BuildOptions, Project};

/// Artifact of the "files" builder: the source tree's file listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileSet {
    app: String,
    files: Vec<String>,
}

impl Artifact for FileSet {
    fn payload(&self) -> Result<Payload, BoxError> {
        Ok(Payload::encode("files.FileSet", self)?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FilesConfig {
    #[serde(default)]
    exclude: Vec<String>,
}

/// Builder that lists the files at the top of the app's source directory.
#[derive(Default)]
struct FilesBuilder {
    config: Arc<Mutex<FilesConfig>>,
}

impl Component for FilesBuilder {
    fn as_builder(&self) -> Option<&dyn Builder> {
        Some(self)
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }
}

#[async_trait]
impl Configurable for FilesBuilder {
    async fn configure(&self, body: &serde_json::Value, _eval: &EvalContext) -> Result<(), Diagnostics> {
        let config: FilesConfig = serde_json::from_value(body.clone())
            .map_err(|e| Diagnostic::error("invalid files builder configuration").with_detail(e.to_string()))?;
        *self.config.lock().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }
}

impl Builder for FilesBuilder {
    fn build_func(&self) -> DynFunc {
        let config = self.config.clone();
        DynFunc::new(move |src: Source, dir: ComponentDir| {
            let exclude = config
                .lock()
                .map(|c| c.exclude.clone())
                .unwrap_or_default();
            async move {
                let files = list_files(&src.path, &exclude).await?;
                let manifest = dir.data_dir().join("manifest.json");
                tokio::fs::write(&manifest, serde_json::to_vec_pretty(&files)?).await?;
                tracing::info!(count = files.len(), manifest = %manifest.display(), "listed source files");
                Ok::<_, BoxError>(Arc::new(FileSet { app: src.app, files }) as Arc<dyn Artifact>)
            }
        })
    }
}

async fn list_files(root: &Path, exclude: &[String]) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_file() && !exclude.contains(&name) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Serialize)]
struct EchoDeployment {
    id: String,
    files: usize,
}

impl Deployment for EchoDeployment {
    fn payload(&self) -> Result<Payload, BoxError> {
        Ok(Payload::encode("echo.Deployment", self)?)
    }
}

/// Platform that "deploys" by printing what it was given.
struct EchoPlatform;

impl Component for EchoPlatform {
    fn as_platform(&self) -> Option<&dyn Platform> {
        Some(self)
    }
}

impl Platform for EchoPlatform {
    fn deploy_func(&self) -> DynFunc {
        DynFunc::new(|artifact: Payload, ui: Arc<dyn Ui>| async move {
            let set: FileSet = artifact.decode()?;
            ui.output(&format!("deploying {} ({} files)", set.app, set.files.len()));
            Ok::<_, BoxError>(Arc::new(EchoDeployment {
                id: format!("{}-v1", set.app),
                files: set.files.len(),
            }) as Arc<dyn Deployment>)
        })
    }

    fn default_releaser_func(&self) -> Option<DynFunc> {
        Some(DynFunc::new(|| async {
            Ok::<_, BoxError>(Arc::new(EchoRouter) as Arc<dyn Component>)
        }))
    }
}

#[derive(Debug, Serialize)]
struct EchoRelease {
    url: String,
}

impl Release for EchoRelease {
    fn payload(&self) -> Result<Payload, BoxError> {
        Ok(Payload::encode("echo.Release", self)?)
    }

    fn url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

struct EchoRouter;

impl Component for EchoRouter {
    fn as_release_manager(&self) -> Option<&dyn ReleaseManager> {
        Some(self)
    }
}

impl ReleaseManager for EchoRouter {
    fn release_func(&self) -> DynFunc {
        DynFunc::new(|deployment: Payload| async move {
            let id = deployment.value["id"].as_str().ok_or("deployment has no id")?;
            Ok::<_, BoxError>(Arc::new(EchoRelease {
                url: format!("http://{id}.localhost"),
            }) as Arc<dyn Release>)
        })
    }
}

/// 引数なしで起動したときの app 設定
fn default_config() -> AppConfig {
    let mut cfg = AppConfig::new("demo");
    cfg.build = Some(BuildConfig {
        operation: OperationConfig::using("files")
            .with_body(serde_json::json!({ "exclude": ["${ignored}"] })),
        registry: None,
    });
    cfg.deploy = Some(OperationConfig::using("echo").with_label("tier", "demo"));
    cfg
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // (A) app 設定を読む（引数があれば JSON ファイル、なければ組み込み）
    let config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => default_config(),
    };

    // (B) plugin を登録した Project を用意
    let root = std::env::current_dir()?;
    let project = Project::builder("launchpad-demo", root)
        .register(
            Role::Builder,
            "files",
            DynFunc::new(|| async {
                Ok::<_, BoxError>(Arc::new(FilesBuilder::default()) as Arc<dyn Component>)
            }),
        )?
        .register(
            Role::Platform,
            "echo",
            DynFunc::new(|| async { Ok::<_, BoxError>(Arc::new(EchoPlatform) as Arc<dyn Component>) }),
        )?
        .data_root(std::env::temp_dir().join("launchpad-demo"))
        .build()?;

    // (C) App を作る（component の構築と設定はここで終わる）
    let ctx = InvocationContext::background().with_timeout(Duration::from_secs(60));
    let eval = EvalContext::new().with_variable("ignored", "Cargo.lock");
    let app = project.app(&ctx, config, &eval).await?;

    // (D) build → push → deploy → release
    let built = app.build(&ctx, BuildOptions::new()).await?;
    let pushed = built.pushed.ok_or("build was not pushed")?;
    let (deployment, _) = app.deploy(&ctx, &pushed).await?;
    let (release, _) = app.release(&ctx, &deployment).await?;

    println!("{}", serde_json::to_string_pretty(&built.build)?);
    println!("{}", serde_json::to_string_pretty(&pushed)?);
    println!("{}", serde_json::to_string_pretty(&deployment)?);
    println!("{}", serde_json::to_string_pretty(&release)?);

    // (E) component の後片付け
    app.close();
    Ok(())
}
