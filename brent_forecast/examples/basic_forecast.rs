use brent_forecast::config::ForecastConfig;
use brent_forecast::data::{FileSource, SeriesLoader};
use brent_forecast::forecaster::forecast;
use brent_forecast::models::{cached_model, provider_from_config};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Brent Forecast: Basic Forecasting Example");
    println!("=========================================\n");

    let config = ForecastConfig::default();

    // Pass a saved copy of the price page to work offline
    let series = match env::args().nth(1) {
        Some(path) => {
            println!("Reading snapshot {}...", path);
            SeriesLoader::new(FileSource::new(path), config.source.table_index).load_cached()?
        }
        None => {
            println!("Fetching {}...", config.source.url);
            SeriesLoader::from_config(&config.source)?.load_cached()?
        }
    };
    println!(
        "Loaded {} observations from {} to {}\n",
        series.len(),
        series.first_date(),
        series.last_date()
    );

    println!("Selecting model...");
    let provider = provider_from_config(&config.model);
    let model = cached_model(provider.as_ref(), &series)?;
    println!("Model: {}\n", model.name());

    let horizon = config.horizon.control_value(14)?;
    let result = forecast(&model, &series, horizon)?;

    println!("Forecast for the next {} days:", result.len());
    for point in result.points() {
        println!("  {}  {:>8.2}", point.date, point.price);
    }

    Ok(())
}
