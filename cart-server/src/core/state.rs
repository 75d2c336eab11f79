use std::sync::Arc;

use redb::Database;

use crate::carts::{CartService, CartStorage};
use crate::catalog::{CatalogLookup, StaticCatalog};
use crate::core::Config;
use crate::discounts::DiscountStore;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是购物车服务的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | carts | CartService | 购物车编排服务 |
/// | discounts | DiscountStore | 折扣码存储 |
/// | catalog | Arc<StaticCatalog> | 商品目录缓存 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 购物车服务 (存储 + 计价 + 折扣编排)
    pub carts: CartService,
    /// 折扣码存储
    pub discounts: DiscountStore,
    /// 商品目录 (内存缓存)
    pub catalog: Arc<StaticCatalog>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 方法代替
    pub fn new(
        config: Config,
        carts: CartService,
        discounts: DiscountStore,
        catalog: Arc<StaticCatalog>,
    ) -> Self {
        Self {
            config,
            carts,
            discounts,
            catalog,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database/cart.db，carts 和 discounts 共用)
    /// 3. 商品目录 (work_dir/catalog.json 存在时加载)
    /// 4. 各服务 (CartStorage, DiscountStore, CartService)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_dir().join("cart.db");
        let db = Arc::new(Database::create(&db_path).expect("Failed to open database"));

        let storage = CartStorage::new(db.clone()).expect("Failed to initialize cart storage");
        let discounts = DiscountStore::new(db).expect("Failed to initialize discount store");

        let catalog_file = config.catalog_file();
        let catalog = if catalog_file.exists() {
            let catalog =
                StaticCatalog::load_from_file(&catalog_file).expect("Failed to load catalog file");
            tracing::info!(path = %catalog_file.display(), products = catalog.len(), "Catalog loaded");
            Arc::new(catalog)
        } else {
            tracing::warn!(path = %catalog_file.display(), "Catalog file not found, starting empty");
            Arc::new(StaticCatalog::new())
        };

        let lookup: Arc<dyn CatalogLookup> = catalog.clone();
        let carts = CartService::new(storage, discounts.clone(), lookup);

        Self::new(config.clone(), carts, discounts, catalog)
    }

    /// 获取购物车服务
    pub fn cart_service(&self) -> &CartService {
        &self.carts
    }

    /// 获取折扣码存储
    pub fn discount_store(&self) -> &DiscountStore {
        &self.discounts
    }
}
