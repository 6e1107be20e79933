use std::fs::File;
use std::io::{BufWriter, Write as IoWrite};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use ulam_binned::*;

#[derive(Parser, Debug)]
#[command(name = "ulam-binned")]
#[command(about = "Ulam 数列 U(a,b): 周期推定 + 剰余ビンによる逐次生成")]
struct Args {
    /// パイプライン設定 (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// DEBUG レベルのログを出す
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// naive 生成で最初の n 項を表示
    Seed {
        a: i64,
        b: i64,
        #[arg(short, long, default_value = "30")]
        n: usize,
    },
    /// λ・連分数・法 (N, D) を表示
    Period {
        a: i64,
        b: i64,
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// パイプライン全体を実行し、項を CSV に保存
    Extend {
        a: i64,
        b: i64,
        /// 試す候補数の上限
        #[arg(long)]
        budget: Option<u64>,
        /// この項数に達したら止める
        #[arg(long)]
        terms: Option<u64>,
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// 1 ≤ a ≤ max_a, a < b ≤ max_b の全組を並列処理
    Survey {
        #[arg(long, default_value = "3")]
        max_a: i64,
        #[arg(long, default_value = "8")]
        max_b: i64,
        #[arg(long)]
        budget: Option<u64>,
        /// 結果を JSON で保存
        #[arg(long)]
        json: bool,
    },
}

fn output_dir() -> PathBuf {
    let dir = PathBuf::from("output");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn timestamp() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (y, mo, d) = civil_from_days(now / 86400);
    let s = now % 60;
    let m = (now / 60) % 60;
    let h = (now / 3600) % 24;
    format!("{:04}{:02}{:02}_{:02}{:02}{:02}", y, mo, d, h, m, s)
}

/// 1970-01-01 からの日数をグレゴリオ暦 (年, 月, 日) に変換
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // 3月始まりの 400 年周期 (146097 日) で数える
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + u64::from(m <= 2);
    (y, m, d)
}

fn load_config(args: &Args) -> std::result::Result<PipelineConfig, UlamError> {
    match &args.config {
        Some(path) => PipelineConfig::from_json_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;

    match args.command {
        Command::Seed { a, b, n } => cmd_seed(a, b, n)?,
        Command::Period { a, b, tolerance } => cmd_period(a, b, tolerance, config)?,
        Command::Extend { a, b, budget, terms, tolerance } => cmd_extend(a, b, budget, terms, tolerance, config)?,
        Command::Survey { max_a, max_b, budget, json } => cmd_survey(max_a, max_b, budget, json, config)?,
    }
    Ok(())
}

fn cmd_seed(a: i64, b: i64, n: usize) -> Result<()> {
    let timer = Instant::now();
    let state = generate_seed(a, b, n)?;
    let elapsed = timer.elapsed();

    println!("{} の最初の {} 項:", UlamPair::new(a, b)?, n);
    for chunk in state.terms().chunks(10) {
        let line: Vec<String> = chunk.iter().map(|t| t.to_string()).collect();
        println!("  {}", line.join(", "));
    }
    println!("一意表現の残り = {}", state.unique_set().len());
    println!("複数表現       = {}", state.multiple_set().len());
    println!("計算時間       = {:?}", elapsed);
    Ok(())
}

fn print_state(state: &IntermediateState) {
    let est = &state.estimate;
    println!("粗い角周波数   = {:.6}", est.coarse_angle);
    println!("精緻化後 x*    = {:.6}", est.angle);
    println!("λ              = {:.10}", est.lambda);
    println!("λ 誤差         = {:.3e}", est.lambda_error);
    println!("中央1/3 比率   = {:.3}", state.middle_third);
    println!("許容誤差 ε     = {:.3e}", state.tolerance);
    println!("連分数         = {} ({:?})", state.fraction, state.fraction.termination);
    println!(
        "収束分数       = {}/{} (誤差 {:.3e})",
        state.fraction.numerator(),
        state.fraction.denominator(),
        state.fraction.error
    );
    println!(
        "法 (N, D)      = ({}, {}){}",
        state.modulus.numerator(),
        state.modulus.denominator(),
        if state.refined { " [精緻化]" } else { "" }
    );
    println!("法の精度       = {:.3}", state.accuracy);
}

fn cmd_period(a: i64, b: i64, tolerance: Option<f64>, mut config: PipelineConfig) -> Result<()> {
    if tolerance.is_some() {
        config.tolerance = tolerance;
    }
    let pair = UlamPair::new(a, b)?;
    let timer = Instant::now();
    let state = initialize(pair, &config)?;
    println!("{} (初期項 {} 個)", pair, state.seed_terms().len());
    print_state(&state);
    println!("計算時間       = {:?}", timer.elapsed());
    Ok(())
}

fn cmd_extend(
    a: i64,
    b: i64,
    budget: Option<u64>,
    terms: Option<u64>,
    tolerance: Option<f64>,
    mut config: PipelineConfig,
) -> Result<()> {
    if let Some(budget) = budget {
        config.term_budget = budget;
    }
    if tolerance.is_some() {
        config.tolerance = tolerance;
    }
    let pair = UlamPair::new(a, b)?;

    let timer = Instant::now();
    let (state, run, report) = extend_pair(pair, &config, terms)?;
    let elapsed = timer.elapsed();

    println!("{}", pair);
    print_state(&state);
    println!();
    println!("--- 拡張 ---");
    println!("終了理由       = {:?}", report.outcome);
    println!("試した候補     = {}", report.candidates_tested);
    println!("追加した項     = {}", report.terms_added);
    println!("総項数         = {}", report.term_count);
    println!("最後の候補     = {}", report.last_tested);
    println!("外れ値比率     = {:.4} (閾値 {:.4})", report.outlier_proportion, report.cutoff);
    println!("計算時間       = {:?}", elapsed);

    let filename = format!("extend_{}_{}_{}.csv", a, b, timestamp());
    let path = output_dir().join(&filename);
    if let Ok(file) = File::create(&path) {
        let extender = run.extender();
        let modulus = extender.modulus();
        let mut w = BufWriter::new(file);
        writeln!(w, "index,term,bin,outlier").ok();
        for (i, t) in extender.terms().iter().enumerate() {
            let bin = modulus.bin(*t);
            writeln!(w, "{},{},{},{}", i + 1, t, bin, modulus.is_outlier_bin(bin)).ok();
        }
        w.flush().ok();
        println!("\n保存: {}", path.display());
    }
    Ok(())
}

fn cmd_survey(max_a: i64, max_b: i64, budget: Option<u64>, json: bool, mut config: PipelineConfig) -> Result<()> {
    if let Some(budget) = budget {
        config.term_budget = budget;
    }
    let pairs = pairs_up_to(max_a, max_b);
    println!(
        "{} 組を処理 (予算 {} 候補/組, {}スレッド並列)",
        pairs.len(),
        config.term_budget,
        rayon::current_num_threads()
    );

    let timer = Instant::now();
    let last_print = Mutex::new(Instant::now());
    let reports = survey(&pairs, &config, None, |done, total| {
        if let Ok(mut lp) = last_print.try_lock() {
            let now = Instant::now();
            if now.duration_since(*lp).as_millis() >= 500 || done == total {
                eprint!("\x1b[2K\r  [{:.1}s] {}/{}", timer.elapsed().as_secs_f64(), done, total);
                *lp = now;
            }
        }
    });
    eprintln!();
    let elapsed = timer.elapsed();

    println!();
    println!("  {:>10}  {:>12}  {:>12}  {:>8}  {:>8}  結果", "pair", "λ", "N/D", "項数", "外れ値");
    for r in &reports {
        match &r.status {
            PairStatus::Completed(run) => println!(
                "  {:>10}  {:>12.6}  {:>12}  {:>8}  {:>8.4}  {:?}",
                r.pair.to_string(),
                r.lambda.unwrap_or(f64::NAN),
                format!("{}/{}", r.numerator.unwrap_or(0), r.denominator.unwrap_or(0)),
                run.term_count,
                run.outlier_proportion,
                run.outcome
            ),
            PairStatus::Skipped { reason } => println!("  {:>10}  スキップ: {}", r.pair.to_string(), reason),
        }
    }
    let skipped = reports.iter().filter(|r| r.is_skipped()).count();
    println!();
    println!("スキップ = {} 組", skipped);
    println!("計算時間 = {:?}", elapsed);

    if json {
        let path = output_dir().join(format!("survey_{}_{}_{}.json", max_a, max_b, timestamp()));
        match serde_json::to_string_pretty(&reports) {
            Ok(text) => {
                if std::fs::write(&path, text).is_ok() {
                    println!("\n保存: {}", path.display());
                }
            }
            Err(e) => eprintln!("JSON 変換に失敗: {}", e),
        }
    }
    Ok(())
}
