//! System check command implementation.

use openio_exporter::config::validate_effective_config;
use openio_exporter::{
    classify, parse_status_line, CommandReportProducer, Config, FileReportProducer, ProcfsStatProvider,
    ReportProducer, StatProvider,
};

/// Validates configuration, the status command and /proc access.
pub fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 OpenIO Exporter - System Check");
    println!("=================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Checking status report...");
    let report = match &config.report_file {
        Some(path) => {
            println!("   ℹ️  Using report file {}", path.display());
            FileReportProducer::new(path).fetch()
        }
        None => {
            let producer = CommandReportProducer::new(
                config.status_command(),
                config.status_args(),
                config.command_timeout(),
            );
            println!("   ℹ️  Running `{}`", producer.command_line());
            producer.fetch()
        }
    };

    let records: Vec<_> = report
        .lines()
        .filter_map(|l| parse_status_line(l).ok())
        .filter(|r| !r.is_header())
        .collect();
    if records.is_empty() {
        println!("   ❌ No process rows in status report");
        all_ok = false;
    } else {
        let up = records.iter().filter(|r| classify(r).up).count();
        println!(
            "   ✅ {} processes reported ({} up, {} not up)",
            records.len(),
            up,
            records.len() - up
        );
    }

    println!("\n📁 Checking process statistics...");
    let provider = ProcfsStatProvider::new(config.proc_root());
    match provider.lookup(std::process::id() as i32) {
        Ok(stat) => println!(
            "   ✅ {} readable (own RSS={}MB)",
            provider.root().display(),
            stat.resident_memory_bytes / 1024 / 1024
        ),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
