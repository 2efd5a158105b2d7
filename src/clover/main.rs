// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use anyhow::Result;
use chargescout::Coordinate;
use chargescout::battery::SysfsBatteryProvider;
use chargescout::controller::AppController;
use chargescout::geocode::{NOMINATIM_BASE_URL, NominatimClient};
use chargescout::geolocation::{
    FixedLocationProvider, IP_API_BASE_URL, IpLocationProvider, UnsupportedLocationProvider,
};
use chargescout::station_directory::{OCM_BASE_URL, OpenChargeMapClient};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fixed latitude, skips the IP-based position lookup
    #[arg(long, requires = "lon")]
    lat: Option<f64>,
    /// Fixed longitude, skips the IP-based position lookup
    #[arg(long, requires = "lat")]
    lon: Option<f64>,
    /// Free-text place search run after the position flow
    #[arg(long)]
    city: Option<String>,
    /// Pretend the platform has no position source at all
    #[arg(long)]
    no_geolocation: bool,
    /// Write the final map state as GeoJSON
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let http = reqwest::Client::builder()
        .user_agent("Mozilla/5.0")
        .build()?;

    let ocm_base = std::env::var("OCM_BASE_URL").unwrap_or_else(|_| OCM_BASE_URL.to_string());
    let nominatim_base =
        std::env::var("NOMINATIM_BASE_URL").unwrap_or_else(|_| NOMINATIM_BASE_URL.to_string());
    let ip_api_base =
        std::env::var("IP_API_BASE_URL").unwrap_or_else(|_| IP_API_BASE_URL.to_string());

    let directory = OpenChargeMapClient::new(http.clone(), &ocm_base)
        .map_err(|e| anyhow::anyhow!(e))?;
    let geocoder =
        NominatimClient::new(http.clone(), &nominatim_base).map_err(|e| anyhow::anyhow!(e))?;

    let mut controller = AppController::new(directory, geocoder);

    controller.read_battery(&SysfsBatteryProvider::new());

    let locate_result = if args.no_geolocation {
        controller.locate_and_route(&UnsupportedLocationProvider).await
    } else if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let provider = FixedLocationProvider {
            position: Coordinate::new(lat, lon),
        };
        controller.locate_and_route(&provider).await
    } else {
        let provider =
            IpLocationProvider::new(http.clone(), &ip_api_base).map_err(|e| anyhow::anyhow!(e))?;
        controller.locate_and_route(&provider).await
    };
    locate_result.map_err(|e| anyhow::anyhow!(e))?;

    if let Some(city) = &args.city {
        if let Err(search_err) = controller.search_city(city).await {
            tracing::error!("city search failed: {}", search_err);
        }
    }

    controller.finish_animation().await;

    println!("{}", controller.location_status);
    println!("{}", controller.battery_status);
    if let Some(alert) = &controller.last_alert {
        println!("{}", alert);
    }

    if let Some(output) = &args.output {
        let canvas = controller.canvas();
        let geojson = canvas.lock().unwrap().to_geojson().to_string();
        tokio::fs::write(output, geojson).await?;
        println!("Wrote map state to {}", output.display());
    }

    Ok(())
}
