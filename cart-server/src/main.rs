use cart_server::{Config, Server, ServerState, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 加载 .env (存在时)
    dotenv::dotenv().ok();

    // 2. 加载配置并初始化日志: 生产环境写滚动日志文件, 开发环境彩色输出到终端
    let config = Config::from_env();
    let log_dir = config.logs_dir();
    let file_dir = if config.is_production() {
        log_dir.to_str()
    } else {
        None
    };
    init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        file_dir,
        config.is_development(),
    );

    print_banner();
    tracing::info!("Cart Server starting...");

    // 3. 初始化服务器状态
    let state = ServerState::initialize(&config).await;

    // 4. 启动 HTTP 服务器
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
