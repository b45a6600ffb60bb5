mod config;
mod report;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::RunnerConfig;
use neo_legacy_vm::{ExecutionEngine, OpCode, StackItem, VMState};
use report::{render_item, state_name, RunReport};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Name of the built-in logging interop.
const RUNTIME_LOG: &[u8] = b"Neo.Runtime.Log";

#[derive(Parser, Debug)]
#[command(name = "neovm", about = "Runs a legacy Neo VM script and prints the outcome as JSON")]
struct Cli {
    /// Script bytes as a hex string.
    #[arg(long, env = "NEOVM_SCRIPT", value_name = "HEX", conflicts_with = "file")]
    script: Option<String>,

    /// Reads the script from a file holding raw bytecode or hex text.
    #[arg(long, env = "NEOVM_FILE", value_name = "PATH")]
    file: Option<PathBuf>,

    /// Overrides the configured gas budget.
    #[arg(long, env = "NEOVM_GAS", value_name = "GAS")]
    gas: Option<u64>,

    /// Path to a TOML file with a `gas` value and a `[limits]` table.
    #[arg(long, env = "NEOVM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Message served to CHECKSIG and CHECKMULTISIG, as hex.
    #[arg(long, env = "NEOVM_MESSAGE", value_name = "HEX")]
    message: Option<String>,

    /// Single-steps the script and logs every instruction.
    #[arg(long, env = "NEOVM_TRACE")]
    trace: bool,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(gas) = cli.gas {
        config.gas = gas;
    }

    let script = match (&cli.script, &cli.file) {
        (Some(text), _) => decode_hex(text).context("--script is not valid hex")?,
        (None, Some(path)) => read_script_file(path)?,
        (None, None) => bail!("either --script or --file is required"),
    };
    let message = cli
        .message
        .as_deref()
        .map(decode_hex)
        .transpose()
        .context("--message is not valid hex")?;

    info!(
        "running {} byte script with gas budget {}",
        script.len(),
        config.gas
    );

    let mut engine = build_engine(&config, message);
    if let Err(err) = engine.load_script(script, -1) {
        error!("failed to load script: {}", err);
        bail!("failed to load script: {err}");
    }

    let state = if cli.trace {
        run_traced(&mut engine, config.gas)
    } else {
        engine.execute(config.gas)
    };

    let report = RunReport::from_engine(&engine);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if state != VMState::HALT {
        bail!("execution ended in {}", state_name(state));
    }
    Ok(())
}

/// Creates an engine with the built-in interops and the signable message.
fn build_engine(config: &RunnerConfig, message: Option<Vec<u8>>) -> ExecutionEngine {
    let mut engine = ExecutionEngine::with_limits(config.limits);
    engine.set_invoke_interop(invoke_builtin);
    if let Some(message) = message {
        engine.set_get_message(move |_iteration| message.clone());
    }
    engine
}

fn invoke_builtin(engine: &mut ExecutionEngine, method: &[u8]) -> bool {
    if method != RUNTIME_LOG {
        warn!("unknown interop {}", String::from_utf8_lossy(method));
        return false;
    }

    let Some(context) = engine.current_context_mut() else {
        return false;
    };
    match context.pop() {
        Ok(item) => {
            info!(target: "neovm::runtime", "{}", describe(&item));
            true
        }
        Err(err) => {
            warn!("Neo.Runtime.Log: {}", err);
            false
        }
    }
}

/// Prints byte strings as text when they are valid UTF-8.
fn describe(item: &StackItem) -> String {
    match item {
        StackItem::ByteArray(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => hex::encode(bytes),
        },
        other => render_item(other, 0).to_string(),
    }
}

fn run_traced(engine: &mut ExecutionEngine, gas: u64) -> VMState {
    engine.set_gas_limit(gas);
    loop {
        if let Some(context) = engine.current_context() {
            let position = context.instruction_pointer();
            let opcode = match context.current_byte() {
                Some(byte) => OpCode::from_byte(byte)
                    .map(|opcode| format!("{opcode:?}"))
                    .unwrap_or_else(|| format!("0x{byte:02x}")),
                None => "RET (end of script)".to_string(),
            };
            info!(
                target: "neovm::trace",
                depth = engine.invocation_stack().len(),
                position,
                gas = engine.gas_consumed(),
                "{}",
                opcode
            );
        }

        let state = engine.step_into();
        if state.is_terminal() {
            info!(target: "neovm::trace", "stopped in {}", state_name(state));
            return state;
        }
    }
}

/// Loads a script file. Files that hold only hex text are decoded.
fn read_script_file(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| decode_hex(text).ok())
        .unwrap_or(bytes))
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    Ok(hex::decode(text)?)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,neo_legacy_vm=info"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
