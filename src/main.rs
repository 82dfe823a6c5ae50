use std::path::Path;
use std::sync::Arc;

use snapform::analytics::{EventSink, MixpanelSink, NoopSink};
use snapform::config::UploadConfig;
use snapform::submission::SelectedFile;
use snapform::workflow::UploadForm;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let admin = args.iter().any(|a| a == "--admin");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let (email, path) = match positional.as_slice() {
        [email, path] => (email.as_str(), path.as_str()),
        _ => {
            eprintln!("Usage: snapform <email> <image-path> [--admin]");
            eprintln!("  SNAPFORM_ENDPOINT_URL    submission endpoint (required)");
            eprintln!("  SNAPFORM_MAX_FILE_SIZE   size ceiling in bytes");
            eprintln!("  SNAPFORM_MIXPANEL_TOKEN  enables analytics");
            std::process::exit(2);
        }
    };

    let config = Arc::new(UploadConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }));

    let sink: Arc<dyn EventSink> = match config.analytics_token.clone() {
        Some(token) => Arc::new(MixpanelSink::new(token)),
        None => Arc::new(NoopSink),
    };

    eprintln!("📸 snapform v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Endpoint: {}", config.endpoint_url);
    eprintln!("   Size limit: {} bytes", config.max_file_size);
    eprintln!(
        "   Analytics: {}",
        if config.analytics_token.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    eprintln!(
        "   Destination: {}\n",
        if admin { "admin" } else { "public" }
    );

    let mut form = if admin {
        UploadForm::admin(Arc::clone(&config), Arc::clone(&sink))
    } else {
        UploadForm::public(Arc::clone(&config), Arc::clone(&sink))
    };

    form.set_email(email);

    let file = SelectedFile::from_path(Path::new(path)).await?;
    let verdict = form.select_file(file).await;
    if !verdict.accepted {
        eprintln!("Rejected: {}", verdict.reason.unwrap_or_default());
        std::process::exit(1);
    }

    match form.submit().await {
        Ok(outcome) if outcome.accepted => {
            eprintln!("Upload completed");
            Ok(())
        }
        Ok(outcome) => {
            eprintln!(
                "Upload failed: {}",
                outcome
                    .error_detail
                    .unwrap_or_else(|| "Unknown error".to_string())
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Upload failed: {e}");
            std::process::exit(1);
        }
    }
}
