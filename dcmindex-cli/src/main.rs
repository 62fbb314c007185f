//! DCMIndex 命令行程序

use anyhow::{Context, Result};
use clap::Parser;
use dcmindex_admin::{init_logging, with_bootstrap_logging, CollectorConfig};
use dcmindex_collector::{CancellationToken, Collector, ScanReport};
use dcmindex_core::{Instance, ModalityType};
use dcmindex_dicom::DicomParser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "dcmindex")]
#[command(about = "扫描目录中的DICOM文件并建立 患者/系列/实例 索引")]
struct Args {
    /// 扫描根目录（覆盖配置文件中的 scan.root）
    root: Option<PathBuf>,

    /// 文件名通配符
    #[arg(short, long)]
    pattern: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,

    /// 扫描后取出指定类别的系列 (image, plan, structure-set, dose, ...)
    #[arg(long)]
    claim: Option<ModalityType>,

    /// 以JSON格式输出结果
    #[arg(long)]
    json: bool,

    /// 打印生效的配置后退出
    #[arg(long)]
    print_config: bool,
}

/// 被取出的系列
#[derive(Debug, Serialize)]
struct ClaimedSeries {
    patient_id: String,
    series_uid: String,
    modality: String,
    instances: Vec<Instance>,
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    report: &'a ScanReport,
    claimed: Vec<ClaimedSeries>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 全局日志尚未初始化，加载阶段使用临时订阅器
    let mut config = with_bootstrap_logging(|| CollectorConfig::load(args.config.as_deref()))?;
    if let Some(root) = args.root {
        config.scan.root = Some(root);
    }
    if let Some(pattern) = args.pattern {
        config.scan.pattern = pattern;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // 初始化日志
    init_logging(&config.logging)?;

    let root = config
        .scan
        .root
        .clone()
        .context("未指定扫描根目录，请通过参数或配置文件 scan.root 提供")?;

    info!("扫描配置:");
    info!("  根目录: {:?}", root);
    info!("  匹配模式: {}", config.scan.pattern);
    info!(
        "  设备映射: {} 条, 型号默认设备: {} 条",
        config.machines.machines.len(),
        config.machines.default_by_model.len()
    );

    let cancel = CancellationToken::new();
    let collector = Collector::new(DicomParser::new(), config.machines.clone(), &config.scan.pattern)?
        .case_sensitive(config.scan.case_sensitive)
        .with_cancellation(cancel.clone());

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在取消扫描");
            signal_token.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || collector.collect(&root))
        .await
        .context("扫描任务异常退出")?;

    let mut outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("扫描失败: {}", e);
            return Err(e.into());
        }
    };

    let claimed: Vec<ClaimedSeries> = match args.claim {
        Some(modality_type) => outcome
            .store
            .find_and_remove_by_modality_type(modality_type)
            .into_iter()
            .map(|(patient_id, series)| ClaimedSeries {
                patient_id,
                series_uid: series.series_uid().to_string(),
                modality: series.modality().code().to_string(),
                instances: series.into_instances().into_iter().collect(),
            })
            .collect(),
        None => Vec::new(),
    };

    if args.json {
        let output = Output {
            report: &outcome.report,
            claimed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for summary in &outcome.report.patients {
        println!(
            "{}\t{} series\t{} instances",
            summary.patient_id, summary.series_count, summary.instance_count
        );
    }
    for series in &claimed {
        println!(
            "claimed\t{}\t{}\t{}\t{} instances",
            series.patient_id,
            series.series_uid,
            series.modality,
            series.instances.len()
        );
    }

    Ok(())
}
