use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use dialer_attendance::config::AppConfig;
use dialer_attendance::error::AppError;
use dialer_attendance::etl::{
    AttendancePipeline, CallRecord, PipelineOutput, SummaryRow, Vendor,
};
use dialer_attendance::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Dialer Attendance ETL",
    about = "Normalize multi-vendor dialer exports into agent attendance reports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run the pipeline over export files and write the report CSVs
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Tata dialer export (omit if not applicable)
    #[arg(long)]
    tata: Option<PathBuf>,
    /// Knowlarity dialer export (omit if not applicable)
    #[arg(long)]
    knowlarity: Option<PathBuf>,
    /// Voiso dialer export (omit if not applicable)
    #[arg(long)]
    voiso: Option<PathBuf>,
    /// Qkonnect dialer export (omit if not applicable)
    #[arg(long)]
    qkonnect: Option<PathBuf>,
    /// Stringee dialer export (omit if not applicable)
    #[arg(long)]
    stringee: Option<PathBuf>,
    /// Agent roster reference file (mandatory)
    #[arg(long)]
    roster: PathBuf,
    /// Directory the report CSVs are written into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

impl ReportArgs {
    fn export_path(&self, vendor: Vendor) -> Option<&PathBuf> {
        match vendor {
            Vendor::Tata => self.tata.as_ref(),
            Vendor::Knowlarity => self.knowlarity.as_ref(),
            Vendor::Voiso => self.voiso.as_ref(),
            Vendor::Qkonnect => self.qkonnect.as_ref(),
            Vendor::Stringee => self.stringee.as_ref(),
        }
    }

    fn exports(&self) -> Vec<(Vendor, PathBuf)> {
        Vendor::ordered()
            .into_iter()
            .filter_map(|vendor| {
                self.export_path(vendor).map(|path| (vendor, path.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AttendanceReportRequest {
    #[serde(default)]
    tata: Option<String>,
    #[serde(default)]
    knowlarity: Option<String>,
    #[serde(default)]
    voiso: Option<String>,
    #[serde(default)]
    qkonnect: Option<String>,
    #[serde(default)]
    stringee: Option<String>,
    roster: String,
}

impl AttendanceReportRequest {
    fn take_payload(&mut self, vendor: Vendor) -> Option<String> {
        match vendor {
            Vendor::Tata => self.tata.take(),
            Vendor::Knowlarity => self.knowlarity.take(),
            Vendor::Voiso => self.voiso.take(),
            Vendor::Qkonnect => self.qkonnect.take(),
            Vendor::Stringee => self.stringee.take(),
        }
    }

    fn into_parts(mut self) -> (Vec<(Vendor, Cursor<Vec<u8>>)>, Cursor<Vec<u8>>) {
        let exports = Vendor::ordered()
            .into_iter()
            .filter_map(|vendor| {
                self.take_payload(vendor)
                    .map(|csv| (vendor, Cursor::new(csv.into_bytes())))
            })
            .collect();

        (exports, Cursor::new(self.roster.into_bytes()))
    }
}

#[derive(Debug, Serialize)]
struct AttendanceReportResponse {
    summary: Vec<SummaryRow>,
    not_found: Vec<CallRecord>,
    dialer_raw_rows: usize,
    null_date_rows: usize,
    invalid_durations: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Report(args) => run_report(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = build_router(state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "dialer attendance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/attendance/report", post(attendance_report_endpoint))
        .with_state(state)
}

fn run_report(args: ReportArgs) -> Result<(), AppError> {
    telemetry::init_cli()?;

    let exports = args.exports();
    let vendors: Vec<&str> = exports.iter().map(|(vendor, _)| vendor.label()).collect();

    let output = AttendancePipeline::from_paths(&exports, args.roster.clone())?;

    if !output.diagnostics.null_dates.is_empty() {
        warn!(
            count = output.diagnostics.null_dates.len(),
            "rows without a parseable date were excluded from attendance"
        );
    }
    if !output.diagnostics.invalid_durations.is_empty() {
        warn!(
            count = output.diagnostics.invalid_durations.len(),
            "unreadable duration values counted as zero seconds"
        );
    }

    let stamp = Local::now().format("%b_%d").to_string();
    let summary_path = args.out_dir.join(format!("summary_{stamp}.csv"));
    let raw_path = args.out_dir.join(format!("dialer_raw_{stamp}.csv"));
    let not_found_path = args.out_dir.join(format!("not_found_users_{stamp}.csv"));

    write_csv(&summary_path, &output.summary)?;
    write_csv(&raw_path, &output.dialer_raw)?;
    write_csv(&not_found_path, &output.not_found)?;

    render_report_run(&output, &vendors);
    println!("\nFiles written");
    println!("- {}", summary_path.display());
    println!("- {}", raw_path.display());
    println!("- {}", not_found_path.display());

    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn render_report_run(output: &PipelineOutput, vendors: &[&str]) {
    println!("Dialer attendance run");
    println!("Vendors: {}", vendors.join(", "));
    println!(
        "Merged call rows: {} ({} without a parseable date)",
        output.dialer_raw.len(),
        output.diagnostics.null_dates.len()
    );
    println!("Summary rows: {}", output.summary.len());

    if output.not_found.is_empty() {
        println!("Unmatched dialer names: none");
    } else {
        println!("Unmatched dialer names: {} rows", output.not_found.len());
    }

    if output.diagnostics.invalid_durations.is_empty() {
        println!("Invalid duration values: none");
    } else {
        println!("Invalid duration values");
        for value in &output.diagnostics.invalid_durations {
            println!("- {value:?}");
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn attendance_report_endpoint(
    Json(payload): Json<AttendanceReportRequest>,
) -> Result<Json<AttendanceReportResponse>, AppError> {
    let (exports, roster) = payload.into_parts();
    let output = AttendancePipeline::from_readers(exports, roster)?;

    Ok(Json(AttendanceReportResponse {
        summary: output.summary,
        not_found: output.not_found,
        dialer_raw_rows: output.dialer_raw.len(),
        null_date_rows: output.diagnostics.null_dates.len(),
        invalid_durations: output.diagnostics.invalid_durations,
    }))
}
