use anyhow::Context;
use clap::Args;
use labelcheck_core::{FieldName, LabelFields, LogRecord};
use labelcheck_ocr::{
    save_composite, LabelPipeline, LabelReport, OcrBackend, OcrInput, TesseractCli,
};
use labelcheck_storage::{LogStore, LogStoreKind};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, OcrBackendKind};
use crate::report::{self, JsonReport};

const COMPOSITE_COLUMNS: u32 = 4;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Label image (PNG, JPEG, WEBP, …)
    pub image: PathBuf,

    /// Expected values as a JSON or TOML file with camelCase field keys
    #[arg(long, short)]
    pub fields: Option<PathBuf>,

    #[arg(long)]
    pub brand_name: Option<String>,
    #[arg(long)]
    pub product_class: Option<String>,
    #[arg(long)]
    pub alcohol_content: Option<String>,
    #[arg(long)]
    pub net_contents: Option<String>,
    #[arg(long)]
    pub manufacturer_name: Option<String>,
    #[arg(long)]
    pub manufacturer_address: Option<String>,

    /// OCR backend (overrides config)
    #[arg(long, value_enum)]
    pub backend: Option<OcrBackendKind>,

    /// Image handed to OCR: `source` or a preprocessing technique (overrides config)
    #[arg(long)]
    pub ocr_input: Option<OcrInput>,

    /// Write a grid of all preprocessed variants to this PNG
    #[arg(long)]
    pub composite: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not append this run to the verification log
    #[arg(long)]
    pub no_log: bool,
}

impl VerifyArgs {
    fn overrides(&self) -> [(FieldName, Option<&String>); 6] {
        [
            (FieldName::BrandName, self.brand_name.as_ref()),
            (FieldName::ProductClass, self.product_class.as_ref()),
            (FieldName::AlcoholContent, self.alcohol_content.as_ref()),
            (FieldName::NetContents, self.net_contents.as_ref()),
            (FieldName::ManufacturerName, self.manufacturer_name.as_ref()),
            (FieldName::ManufacturerAddress, self.manufacturer_address.as_ref()),
        ]
    }
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Number of most recent runs to show
    #[arg(long, short, default_value = "20")]
    pub limit: usize,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

/// Expected values from `--fields`, with per-field flags layered on top.
pub fn load_fields(args: &VerifyArgs) -> anyhow::Result<LabelFields> {
    let mut fields = match &args.fields {
        Some(path) => read_fields_file(path)?,
        None => LabelFields::default(),
    };
    for (field, value) in args.overrides() {
        if let Some(value) = value {
            fields.set(field, value.as_str());
        }
    }
    Ok(fields)
}

fn read_fields_file(path: &Path) -> anyhow::Result<LabelFields> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fields file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    let fields = if is_toml {
        toml::from_str(&text).map_err(anyhow::Error::from)
    } else {
        serde_json::from_str(&text).map_err(anyhow::Error::from)
    };
    fields.with_context(|| format!("Invalid fields file {}", path.display()))
}

pub async fn verify(config: &AppConfig, args: VerifyArgs) -> anyhow::Result<()> {
    let backend = args.backend.unwrap_or(config.ocr.backend);
    match backend {
        OcrBackendKind::Cli => {
            let mut cli = TesseractCli::new(config.ocr.tesseract_path.clone(), &config.ocr.language);
            if let Some(dir) = &config.ocr.tessdata_dir {
                cli = cli.with_tessdata_dir(dir.clone());
            }
            run_verify(cli, config, &args).await
        }
        #[cfg(feature = "tesseract")]
        OcrBackendKind::Library => {
            let data_path = config
                .ocr
                .tessdata_dir
                .as_ref()
                .map(|d| d.to_string_lossy().into_owned());
            let recognizer = labelcheck_ocr::recognizer::leptess_backend::LepTessRecognizer::new(
                data_path,
                &config.ocr.language,
            );
            run_verify(recognizer, config, &args).await
        }
        #[cfg(not(feature = "tesseract"))]
        OcrBackendKind::Library => Err(labelcheck_ocr::OcrError::NotAvailable.into()),
    }
}

/// Verify one image with `recognizer`, print the report, and log the run.
pub async fn run_verify<R: OcrBackend + 'static>(
    recognizer: R,
    config: &AppConfig,
    args: &VerifyArgs,
) -> anyhow::Result<()> {
    let fields = load_fields(args)?;
    let ocr_input = match args.ocr_input {
        Some(input) => input,
        None => config.ocr.ocr_input()?,
    };
    let pipeline = LabelPipeline::new(recognizer)
        .with_ocr_input(ocr_input)
        .keep_variants(args.composite.is_some());

    let show_progress = !args.json && std::io::stderr().is_terminal();
    let report = pipeline
        .verify_file(&args.image, &fields.entries(), |pct| {
            if show_progress {
                eprint!("\rVerifying… {pct:>3}%");
            } else {
                tracing::trace!(pct, "progress");
            }
        })
        .await?;
    if show_progress {
        eprintln!();
    }

    if let Some(path) = &args.composite {
        save_composite(&report.variants, COMPOSITE_COLUMNS, path)?;
        tracing::info!("Composite written to {}", path.display());
    }

    let image_name = image_name(&args.image);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&JsonReport::new(&image_name, &report))?);
    } else {
        println!("{}", report::render(&report));
    }

    if !args.no_log {
        log_run(config, &image_name, fields, &report).await;
    }
    Ok(())
}

/// Persist the run. A logging failure never fails a verification.
async fn log_run(config: &AppConfig, image_name: &str, fields: LabelFields, report: &LabelReport) {
    let record = LogRecord::new(image_name, fields, report.ocr_text(), report.results.clone());
    let path = config.log_path();
    let outcome = async {
        let store = LogStore::open(config.log.store, &path).await?;
        store.append(&record).await
    }
    .await;
    match outcome {
        Ok(()) => tracing::debug!("Run logged to {}", path.display()),
        Err(e) => tracing::warn!("Failed to log verification run: {e}"),
    }
}

pub async fn logs(config: &AppConfig, args: LogsArgs) -> anyhow::Result<()> {
    let path = config.log_path();
    if config.log.store == LogStoreKind::Sqlite && !path.exists() {
        // Opening would create an empty database.
        println!("No verification runs logged yet");
        return Ok(());
    }
    let store = LogStore::open(config.log.store, &path)
        .await
        .with_context(|| format!("Failed to open log {}", path.display()))?;
    let records = store.recent(args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No verification runs logged yet");
    } else {
        for record in &records {
            println!("{}", report::render_log_line(record));
        }
    }
    Ok(())
}

fn image_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
