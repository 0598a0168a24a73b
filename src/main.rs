// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # dinoweb
//!
//! 程序入口。启动顺序：
//! 1. 日志系统（`config/log4rs.yaml`，缺失时回退到控制台输出）
//! 2. 配置（`DINOWEB_CONFIG`，默认 `config/development.toml`）
//! 3. 模板、静态资源根目录与路由
//! 4. tokio 运行时与监听器
//! 5. 标准输入上的管理控制台与 Ctrl-C，二者都会停止接收循环

use dinoweb::{build_router, Config, Server};

use log::{error, info, warn, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    runtime::Builder,
    sync::Notify,
};

use std::{
    env,
    error::Error,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const CONFIG_ENV: &str = "DINOWEB_CONFIG";
const DEFAULT_CONFIG: &str = "config/development.toml";

fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::from_toml(&config_path);
    info!("template root: {}", config.template_root());
    info!("asset root: {}", config.asset_root());

    let router = match build_router(&config) {
        Ok(router) => router,
        Err(e) => {
            error!("cannot start without templates: {}", e);
            return Err(e.into());
        }
    };

    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let addr = config.socket_addr();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("cannot bind {}: {}", addr, e);
                return Err(Box::<dyn Error>::from(e));
            }
        };
        info!("listening on http://{}", addr);

        let server = Server::new(router, config);
        let shutdown = Arc::new(Notify::new());

        tokio::spawn(console(Arc::clone(&shutdown), server.active_connections()));
        tokio::spawn({
            let shutdown = Arc::clone(&shutdown);
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received");
                    shutdown.notify_one();
                }
            }
        });

        server.run(listener, async move { shutdown.notified().await }).await;
        info!("server stopped");
        Ok(())
    })
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    if log4rs::init_file(LOG_CONFIG, Default::default()).is_ok() {
        return Ok(());
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(log_config)?;
    warn!("{} not found, logging to the console at info level", LOG_CONFIG);
    Ok(())
}

/// 从标准输入读取的运维指令。
async fn console(shutdown: Arc<Notify>, active_connections: Arc<AtomicUsize>) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                println!("stopping: no new connections will be accepted");
                shutdown.notify_one();
                break;
            }
            "status" => {
                println!("== dinoweb status ==");
                println!("active connections: {}", active_connections.load(Ordering::SeqCst));
                println!("====================");
            }
            "help" => {
                println!("== dinoweb help ==");
                println!("stop   - stop accepting connections and exit");
                println!("status - show the number of active connections");
                println!("help   - show this message");
                println!("==================");
            }
            "" => {}
            other => println!("unknown command: {}", other),
        }
    }
}
