//! Data acquisition: timetable scraping and weather lookups.
//!
//! Both sources return raw, untyped rows; the cleaner is responsible for
//! turning them into typed tables.

pub mod scraper;
pub mod weather;

pub use self::scraper::{DELAY_TABLE_CLASS, ScrapedTable, parse_delay_table, scrape_delays};
pub use self::weather::{WeatherObservation, fetch_weather};
