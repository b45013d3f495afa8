use std::sync::Arc;

use pppat_model::WaveformStore;
use wasmtime::{Engine, ExternType, FuncType, Linker, Module, Store, Trap};

use crate::config::SandboxConfig;
use crate::host::{self, GuestAbort, HostState};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("WASM engine error: {0}")]
    Engine(#[from] wasmtime::Error),

    #[error("Rule unit is {size} bytes, limit is {max}")]
    ModuleTooLarge { size: u64, max: u64 },

    #[error("Export not found: {name}")]
    ExportNotFound { name: String },

    #[error("Export '{name}' has signature {found}, expected (i32) -> i32")]
    Signature { name: String, found: String },

    #[error("Fuel exhausted during execution")]
    FuelExhausted,

    /// The rule called `fail`; the message is the rule's own.
    #[error("{0}")]
    Aborted(String),

    #[error("Trap in '{name}': {message}")]
    Trap { name: String, message: String },
}

/// What a rule function reported back through its return value and the
/// `set_name`/`set_text` imports.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestOutcome {
    pub code: i32,
    pub name: Option<String>,
    pub text: Option<String>,
}

/// The WASM sandbox: compiles rule units and runs their functions in
/// fresh, isolated instances.
pub struct Sandbox {
    engine: Engine,
    linker: Linker<HostState>,
    config: SandboxConfig,
}

/// A compiled rule unit. Cheap to share between threads.
#[derive(Debug)]
pub struct LoadedModule {
    module: Module,
}

impl Sandbox {
    /// Create a new sandbox with the given configuration.
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let mut engine_config = wasmtime::Config::new();

        if config.fuel_per_call.is_some() {
            engine_config.consume_fuel(true);
        }

        // Rules are pure computations over the store.
        engine_config.wasm_threads(false);

        let engine = Engine::new(&engine_config)?;
        let mut linker = Linker::new(&engine);
        host::link(&mut linker)?;

        Ok(Self {
            engine,
            linker,
            config: config.clone(),
        })
    }

    /// Compile a rule unit from binary WASM (or WAT text).
    pub fn load_module(&self, wasm_bytes: &[u8]) -> Result<LoadedModule, SandboxError> {
        let size = wasm_bytes.len() as u64;
        if size > self.config.max_module_bytes {
            return Err(SandboxError::ModuleTooLarge {
                size,
                max: self.config.max_module_bytes,
            });
        }
        let module = Module::new(&self.engine, wasm_bytes)?;
        Ok(LoadedModule { module })
    }

    /// List all exports from a module as (name, kind) pairs, in the
    /// module's declaration order.
    pub fn list_exports(&self, loaded: &LoadedModule) -> Vec<(String, String)> {
        loaded
            .module
            .exports()
            .map(|export| {
                let kind = match export.ty() {
                    ExternType::Func(_) => "func",
                    ExternType::Global(_) => "global",
                    ExternType::Memory(_) => "memory",
                    ExternType::Table(_) => "table",
                    _ => "other",
                };
                (export.name().to_string(), kind.to_string())
            })
            .collect()
    }

    /// Run one exported rule function in a fresh instance.
    ///
    /// Each call gets its own store, so a trap or a corrupted guest memory
    /// never leaks into the next call.
    pub fn call_check(
        &self,
        loaded: &LoadedModule,
        name: &str,
        is_online: bool,
        waveforms: Arc<WaveformStore>,
    ) -> Result<GuestOutcome, SandboxError> {
        let data = HostState::new(self.config.memory_limit_bytes, waveforms);
        let mut store = Store::new(&self.engine, data);
        store.limiter(|data| data);

        if let Some(fuel) = self.config.fuel_per_call {
            store.set_fuel(fuel)?;
        }

        let instance = self
            .linker
            .instantiate(&mut store, &loaded.module)
            .map_err(|err| classify_failure(name, err))?;

        let func = instance
            .get_func(&mut store, name)
            .ok_or_else(|| SandboxError::ExportNotFound {
                name: name.to_string(),
            })?;

        let typed = func
            .typed::<i32, i32>(&store)
            .map_err(|_| SandboxError::Signature {
                name: name.to_string(),
                found: describe_signature(&func.ty(&store)),
            })?;

        let code = typed
            .call(&mut store, i32::from(is_online))
            .map_err(|err| classify_failure(name, err))?;

        let state = store.into_data();
        Ok(GuestOutcome {
            code,
            name: state.name,
            text: state.text,
        })
    }

    /// Get the sandbox configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

fn classify_failure(name: &str, err: wasmtime::Error) -> SandboxError {
    if let Some(abort) = err.downcast_ref::<GuestAbort>() {
        return SandboxError::Aborted(abort.0.clone());
    }
    if let Some(Trap::OutOfFuel) = err.downcast_ref::<Trap>() {
        return SandboxError::FuelExhausted;
    }
    SandboxError::Trap {
        name: name.to_string(),
        message: err.root_cause().to_string(),
    }
}

fn describe_signature(ty: &FuncType) -> String {
    let params: Vec<String> = ty.params().map(|p| p.to_string()).collect();
    let results: Vec<String> = ty.results().map(|r| r.to_string()).collect();
    format!("({}) -> ({})", params.join(", "), results.join(", "))
}
