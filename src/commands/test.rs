//! Test command implementation.

use openio_exporter::{CollectionResult, Collector, Config};
use std::time::Instant;

use crate::cli::ConfigFormat;

/// Serializes one cycle result in the requested format.
fn render_result(result: &CollectionResult, format: &ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(result)?,
        ConfigFormat::Toml => toml::to_string_pretty(result)?,
        ConfigFormat::Yaml => serde_yaml::to_string(result)?,
    })
}

/// Runs collection cycles and prints their outcome.
pub fn command_test(
    iterations: usize,
    verbose: bool,
    format: ConfigFormat,
    config: &Config,
) -> anyhow::Result<()> {
    println!("🧪 OpenIO Exporter - Test Mode");
    println!("==============================");

    let collector = Collector::from_config(config);

    for iteration in 1..=iterations {
        println!("\n🔄 Iteration {}/{}:", iteration, iterations);

        let start = Instant::now();
        let result = collector.collect();
        let duration = start.elapsed();

        println!("   ⏱️  Cycle duration: {:.2}ms", duration.as_secs_f64() * 1000.0);
        println!("   📊 up: {}", if result.overall_up { 1 } else { 0 });
        println!(
            "   📈 Processes: {} ({} up, {} with stats)",
            result.samples.len(),
            result.samples.iter().filter(|s| s.up).count(),
            result.samples.iter().filter(|s| s.has_stats()).count()
        );
        println!("   ⚠️  Diagnostics: {}", result.diagnostics.len());

        if verbose {
            println!("{}", render_result(&result, &format)?);
        }
    }

    println!("\n✅ Test completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use openio_exporter::{ProcStat, StatError, StatProvider, StaticReport};

    struct ConstStats;

    impl StatProvider for ConstStats {
        fn lookup(&self, _pid: i32) -> Result<ProcStat, StatError> {
            Ok(ProcStat {
                virtual_memory_bytes: 100,
                resident_memory_bytes: 1000,
                cpu_seconds: 10.0,
                start_time_seconds: 10000.0,
            })
        }
    }

    fn collect(report: &str) -> CollectionResult {
        Collector::new(Box::new(StaticReport::new(report)), Box::new(ConstStats)).collect()
    }

    #[test]
    fn test_render_healthy_cycle_in_every_format() {
        let result = collect("a UP 1 g\n");
        for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
            let rendered = render_result(&result, &format).unwrap();
            assert!(rendered.contains("overall_up"), "{:?}: {}", format, rendered);
        }
    }

    #[test]
    fn test_render_toml_with_samples_and_diagnostics() {
        let result = collect("a UP 1 g\nb WEIRD 2 g\nA B C\n");
        let rendered = render_result(&result, &ConfigFormat::Toml).unwrap();

        assert!(rendered.contains("[[samples]]"));
        assert!(rendered.contains("[[diagnostics]]"));
        assert!(rendered.contains("kind = \"unknown_status\""));
    }

    #[test]
    fn test_render_toml_empty_cycle() {
        let rendered = render_result(&CollectionResult::default(), &ConfigFormat::Toml).unwrap();
        assert_eq!(rendered.trim(), "overall_up = false");
    }
}
