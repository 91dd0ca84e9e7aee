//! Wox plugin host entry point.
//!
//! Spawned by Wox as `wox-plugin-host <port> <logDirectory> <woxPid>`.
//! Serves the plugin JSON-RPC WebSocket on the given port and exits when
//! the Wox process dies.

use std::time::Duration;

use uuid::Uuid;

use host_core::dispatch;
use liblogger::Logger;

mod process_watcher;
use process_watcher::ProcessWatcher;

fn parse_args() -> Result<(u16, String, u32), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        return Err(format!("Usage: {} <port> <logDirectory> <woxPid>", args[0]));
    }
    let port = args[1].parse::<u16>().map_err(|_| format!("invalid port: {}", args[1]))?;
    let wox_pid = args[3].parse::<u32>().map_err(|_| format!("invalid wox pid: {}", args[3]))?;
    Ok((port, args[2].clone(), wox_pid))
}

async fn monitor_wox_process(mut watcher: ProcessWatcher, trace_id: String) {
    Logger::info(&trace_id, "start monitor wox process");
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        if !watcher.is_alive() {
            Logger::error(&trace_id, "wox process is not alive, exit");
            Logger::flush();
            watcher.close();
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let (port, log_directory, wox_pid) = match parse_args() {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    Logger::update_log_directory(&log_directory);

    let trace_id = Uuid::new_v4().to_string();
    let host_id = format!("rust-{}", Uuid::new_v4());
    Logger::info(&trace_id, "----------------------------------------");
    Logger::info(&trace_id, &format!("start plugin host: {}", host_id));
    Logger::info(&trace_id, &format!("port: {}", port));
    Logger::info(&trace_id, &format!("wox pid: {}", wox_pid));

    // The handle must be acquired before serving; on Windows a later open
    // could bind a recycled PID.
    let watcher = ProcessWatcher::new(wox_pid);
    tokio::spawn(monitor_wox_process(watcher, trace_id.clone()));

    if let Err(e) = libws::serve(port, dispatch::handle_message).await {
        Logger::error(&trace_id, &format!("websocket server failed: {}", e));
        Logger::flush();
        std::process::exit(1);
    }
}
