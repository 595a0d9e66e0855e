//! CLI surface: one query against the bundled fixture, or a thin HTTP
//! server exposing the same computation. Follows the teacher's
//! `main.rs::Cli`/`Commands` shape, trading the CIF-file argument for the
//! in-memory fixture provider (GTFS/CIF ingestion is out of core scope).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::Weekday;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use transit_isochrones::provider::fixture::FixtureProvider;
use transit_isochrones::query::IsochroneService;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs one query against the bundled fixture schedule and prints the
    /// resulting GeoJSON FeatureCollection.
    Query {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value_t = 15)]
        budget_minutes: i64,
        #[arg(long, default_value = "wednesday")]
        weekday: String,
        #[arg(long)]
        departure_minutes: i64,
    },
    /// Serves the same computation over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::Query { lat, lon, budget_minutes, weekday, departure_minutes } => {
            let weekday = parse_weekday(&weekday)?;
            let service = IsochroneService::new(FixtureProvider::reference_fixture())?;
            let collection =
                service.compute_isochrone(lat, lon, budget_minutes, weekday, departure_minutes, None)?;
            println!("{}", collection.to_string());
            Ok(())
        }
        Commands::Serve { addr } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve(addr))
        }
    }
}

fn parse_weekday(raw: &str) -> anyhow::Result<Weekday> {
    raw.parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("unrecognised weekday: {raw}"))
}

struct AppState {
    service: IsochroneService<FixtureProvider>,
}

#[derive(Deserialize)]
struct IsochroneParams {
    lat: f64,
    lon: f64,
    budget_minutes: i64,
    weekday: String,
    departure_minutes: i64,
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        service: IsochroneService::new(FixtureProvider::reference_fixture())?,
    });

    let app = axum::Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/isochrone", get(isochrone_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument(skip(state))]
async fn isochrone_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IsochroneParams>,
) -> Response {
    let weekday = match parse_weekday(&params.weekday) {
        Ok(w) => w,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.service.compute_isochrone(
        params.lat,
        params.lon,
        params.budget_minutes,
        weekday,
        params.departure_minutes,
        None,
    ) {
        Ok(collection) => Json(collection).into_response(),
        Err(e @ transit_isochrones::Error::InvalidInput(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
