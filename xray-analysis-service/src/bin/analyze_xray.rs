use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use xray_prompting::{
    AdaptiveController, AnalysisRequest, Analyzer, GeminiClient, ImagePayload, ImageSummary,
    MediaType, PatientContext, PromptVariant, Settings, render_adaptive_report, render_report,
};

#[derive(Debug, Parser)]
#[command(
    name = "analyze-xray",
    version,
    about = "Screen a chest X-ray for pneumonia with a vision model (educational use only)"
)]
struct Cli {
    /// JPEG, PNG or WebP image
    image: PathBuf,

    /// zero-shot, one-shot, multi-shot, chain-of-thought or dynamic
    #[arg(long, default_value = "zero-shot")]
    variant: PromptVariant,

    #[arg(long)]
    temperature: Option<f32>,

    /// Run the two-step adaptive analysis instead of a single prompt
    #[arg(long)]
    adaptive: bool,

    #[arg(long)]
    age: Option<u32>,

    #[arg(long)]
    symptoms: Option<String>,

    /// e.g. "immunocompromised"
    #[arg(long)]
    history: Option<String>,

    /// e.g. "emergency"
    #[arg(long)]
    urgency: Option<String>,

    /// Print the structured result as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn patient_context(&self) -> PatientContext {
        PatientContext {
            age: self.age,
            symptoms: self.symptoms.clone(),
            medical_history: self.history.clone(),
            urgency: self.urgency.clone(),
            ..Default::default()
        }
    }
}

fn media_type(path: &std::path::Path) -> Result<MediaType> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("{} has no file extension", path.display()))?;
    MediaType::from_extension(ext)
        .ok_or_else(|| anyhow!("unsupported image type .{ext}; use JPEG, PNG or WebP"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let has_patient_details = cli.age.is_some()
        || cli.symptoms.is_some()
        || cli.history.is_some()
        || cli.urgency.is_some();
    if has_patient_details && !cli.adaptive {
        bail!("patient details are only used with --adaptive");
    }

    let settings = Settings::from_env()?;
    let client = Arc::new(
        GeminiClient::new(&settings).context("set GEMINI_API_KEY to call the vision model")?,
    );

    let bytes = tokio::fs::read(&cli.image)
        .await
        .with_context(|| format!("reading {}", cli.image.display()))?;
    let image = ImagePayload::new(bytes, media_type(&cli.image)?)?;

    if cli.adaptive {
        let controller = AdaptiveController::new(client);
        let session = controller
            .start("cli", &image, cli.patient_context())
            .await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&session)?);
        } else if let Some(report) = render_adaptive_report(&session) {
            println!("{report}");
        }
        return Ok(());
    }

    let summary = ImageSummary {
        name: cli
            .image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        size_bytes: image.len(),
    };
    let mut request = AnalysisRequest::new(image, cli.variant);
    request.temperature = cli.temperature;

    let outcome = Analyzer::new(client).analyze(request).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", render_report(&outcome, &summary));
    }

    Ok(())
}
