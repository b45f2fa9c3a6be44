//! Todo application bootstrap wired through Ambit.
//!
//! Run with `RUST_LOG=ambit_container=debug cargo run --example todo_app`.

use std::collections::BTreeMap;
use std::sync::Arc;

use ambit::prelude::*;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

// === Capabilities ===

trait Storage: Disposable {
    fn save(&self, key: &str, value: String);
    fn load(&self, key: &str) -> Option<String>;
}

trait Validator: Send + Sync {
    fn validate(&self, title: &str) -> std::result::Result<(), String>;
}

trait DateService: Send + Sync {
    fn today(&self) -> String;
}

// === Implementations ===

#[derive(Default)]
struct MemoryStorage {
    label: &'static str,
    items: Mutex<BTreeMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn save(&self, key: &str, value: String) {
        self.items.lock().insert(key.to_string(), value);
    }

    fn load(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }
}

#[async_trait]
impl Disposable for MemoryStorage {
    async fn dispose(&self) -> std::result::Result<(), BoxError> {
        println!("💾 flushing {} storage ({} items)", self.label, self.items.lock().len());
        Ok(())
    }
}

struct TitleValidator {
    max_len: usize,
}

impl Validator for TitleValidator {
    fn validate(&self, title: &str) -> std::result::Result<(), String> {
        match title.trim().len() {
            0 => Err("title is empty".into()),
            n if n > self.max_len => Err(format!("title longer than {}", self.max_len)),
            _ => Ok(()),
        }
    }
}

struct FixedDate(&'static str);

impl DateService for FixedDate {
    fn today(&self) -> String {
        self.0.to_string()
    }
}

struct TodoService {
    storage: Arc<dyn Storage>,
    validator: Arc<dyn Validator>,
    dates: Arc<dyn DateService>,
}

impl TodoService {
    fn add(&self, id: u32, title: &str) -> std::result::Result<(), String> {
        self.validator.validate(title)?;
        self.storage
            .save(&format!("todo:{id}"), format!("{title} (added {})", self.dates.today()));
        Ok(())
    }

    fn get(&self, id: u32) -> Option<String> {
        self.storage.load(&format!("todo:{id}"))
    }
}

// === Tokens ===

static STORAGE: Lazy<Token<dyn Storage>> =
    Lazy::new(|| Token::with_description("Storage", "persists todo items"));
static VALIDATOR: Lazy<Token<dyn Validator>> = Lazy::new(|| Token::new("Validator"));
static DATES: Lazy<Token<dyn DateService>> = Lazy::new(|| Token::new("DateService"));
static TODOS: Lazy<Token<TodoService>> = Lazy::new(|| Token::new("TodoService"));

struct CoreProvider;

impl Provider for CoreProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.singleton(
            &STORAGE,
            Factory::shared(|_| {
                Ok(Arc::new(MemoryStorage { label: "app", ..Default::default() }) as Arc<dyn Storage>)
            })
            .disposable(),
        )?;
        container.transient(
            &VALIDATOR,
            Factory::shared(|_| Ok(Arc::new(TitleValidator { max_len: 40 }) as Arc<dyn Validator>)),
        )?;
        container.register_instance(&DATES, Arc::new(FixedDate("2026-10-19")) as Arc<dyn DateService>)?;
        container.singleton(
            &TODOS,
            Factory::new(|r| {
                Ok(TodoService {
                    storage: r.resolve(&STORAGE)?,
                    validator: r.resolve(&VALIDATOR)?,
                    dates: r.resolve(&DATES)?,
                })
            }),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ambit_container=info".into()),
        )
        .init();

    let container = Container::new();
    container.install(&CoreProvider)?;
    println!("✅ Container ready: {container:?}");

    let todos = container.resolve(&TODOS)?;
    if let Err(e) = todos.add(1, "write the release notes") {
        println!("⚠️ {e}");
    }
    println!("📋 {}", todos.get(1).unwrap_or_default());

    // A preview pane gets its own storage; everything else is shared.
    {
        let preview = container.create_scope()?;
        let scratch = Arc::new(MemoryStorage { label: "preview", ..Default::default() });
        preview.register_disposable(&STORAGE, scratch as Arc<dyn Storage>)?;

        let preview_todos = preview.resolve(&TODOS)?;
        if let Err(e) = preview_todos.add(2, "draft only") {
            println!("⚠️ {e}");
        }
        println!("🔍 preview sees #2: {:?}", preview_todos.get(2));
        println!("🏠 app sees #2: {:?}", todos.get(2));

        if let Err(e) = preview_todos.add(3, "   ") {
            println!("⚠️ rejected: {e}");
        }
        preview.dispose().await;
    }

    // a typo'd token gets a "did you mean" hint
    if let Err(e) = container.resolve(&Token::<String>::new("Storge")) {
        println!("❌ {e}");
    }

    container.dispose().await;
    println!("\n🎉 Shut down cleanly");
    Ok(())
}
