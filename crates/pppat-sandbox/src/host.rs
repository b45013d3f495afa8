//! The `pulse` host module: the only imports a rule unit may use.
//!
//! | import           | signature            | meaning                                    |
//! |------------------|----------------------|--------------------------------------------|
//! | `waveform_find`  | `(ptr, len) -> i32`  | handle of the named waveform, -1 if absent |
//! | `waveform_len`   | `(h) -> i32`         | number of samples                          |
//! | `waveform_time`  | `(h, i) -> f64`      | time of sample `i`                         |
//! | `waveform_value` | `(h, i) -> f64`      | value of sample `i`                        |
//! | `waveform_max`   | `(h) -> f64`         | largest value, traps on an empty waveform  |
//! | `set_name`       | `(ptr, len)`         | result name (defaults to the export name)  |
//! | `set_text`       | `(ptr, len)`         | result message                             |
//! | `fail`           | `(ptr, len)`         | abort the call with the given message      |
//!
//! Strings are UTF-8 slices of the unit's exported `memory`.

use std::sync::Arc;

use anyhow::anyhow;
use pppat_model::{Waveform, WaveformStore};
use wasmtime::{Caller, Linker};

/// Import module name rule units link against.
pub const HOST_MODULE: &str = "pulse";

/// Longest string a rule unit may hand to the host.
const MAX_GUEST_STRING: usize = 64 * 1024;

/// Raised by the `fail` import; carries the rule's own message.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct GuestAbort(pub String);

/// Per-call store data: resource limits, the pulse's waveforms, and the
/// name/text the rule reported.
pub struct HostState {
    memory_limit_bytes: u64,
    waveforms: Arc<WaveformStore>,
    /// Waveform ids opened by the guest; a handle is an index here.
    handles: Vec<String>,
    pub(crate) name: Option<String>,
    pub(crate) text: Option<String>,
}

impl HostState {
    pub(crate) fn new(memory_limit_bytes: u64, waveforms: Arc<WaveformStore>) -> Self {
        Self {
            memory_limit_bytes,
            waveforms,
            handles: Vec::new(),
            name: None,
            text: None,
        }
    }

    fn open(&mut self, id: &str) -> i32 {
        if !self.waveforms.contains(id) {
            return -1;
        }
        let index = match self.handles.iter().position(|h| h == id) {
            Some(index) => index,
            None => {
                self.handles.push(id.to_string());
                self.handles.len() - 1
            }
        };
        i32::try_from(index).unwrap_or(-1)
    }

    fn waveform(&self, handle: i32) -> anyhow::Result<&Waveform> {
        let id = usize::try_from(handle)
            .ok()
            .and_then(|index| self.handles.get(index))
            .ok_or_else(|| anyhow!("invalid waveform handle {handle}"))?;
        self.waveforms
            .get(id)
            .ok_or_else(|| anyhow!("waveform '{id}' disappeared from the store"))
    }

    fn sample(&self, handle: i32, index: i32, pick: fn(&Waveform) -> &[f64]) -> anyhow::Result<f64> {
        let waveform = self.waveform(handle)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| pick(waveform).get(i).copied())
            .ok_or_else(|| {
                anyhow!(
                    "sample {index} out of range for waveform '{}' ({} samples)",
                    waveform.id(),
                    waveform.len()
                )
            })
    }
}

impl wasmtime::ResourceLimiter for HostState {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok((desired as u64) <= self.memory_limit_bytes)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok(desired <= 10_000)
    }
}

fn read_guest_str(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> anyhow::Result<String> {
    let memory = caller
        .get_export("memory")
        .and_then(|export| export.into_memory())
        .ok_or_else(|| anyhow!("rule unit does not export its memory"))?;

    let start = usize::try_from(ptr).map_err(|_| anyhow!("negative string pointer {ptr}"))?;
    let len = usize::try_from(len).map_err(|_| anyhow!("negative string length {len}"))?;
    if len > MAX_GUEST_STRING {
        return Err(anyhow!("string of {len} bytes exceeds {MAX_GUEST_STRING}"));
    }

    let mut buf = vec![0u8; len];
    memory
        .read(&*caller, start, &mut buf)
        .map_err(|_| anyhow!("string at {start}+{len} is outside guest memory"))?;
    Ok(String::from_utf8(buf)?)
}

/// Register every `pulse` import on the linker.
pub(crate) fn link(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        HOST_MODULE,
        "waveform_find",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<i32> {
            let id = read_guest_str(&mut caller, ptr, len)?;
            Ok(caller.data_mut().open(&id))
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "waveform_len",
        |caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<i32> {
            let waveform = caller.data().waveform(handle)?;
            Ok(i32::try_from(waveform.len())?)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "waveform_time",
        |caller: Caller<'_, HostState>, handle: i32, index: i32| -> anyhow::Result<f64> {
            caller.data().sample(handle, index, Waveform::times)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "waveform_value",
        |caller: Caller<'_, HostState>, handle: i32, index: i32| -> anyhow::Result<f64> {
            caller.data().sample(handle, index, Waveform::values)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "waveform_max",
        |caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<f64> {
            let waveform = caller.data().waveform(handle)?;
            waveform
                .max_value()
                .ok_or_else(|| anyhow!("waveform '{}' has no samples", waveform.id()))
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "set_name",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
            let name = read_guest_str(&mut caller, ptr, len)?;
            caller.data_mut().name = Some(name);
            Ok(())
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "set_text",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
            let text = read_guest_str(&mut caller, ptr, len)?;
            caller.data_mut().text = Some(text);
            Ok(())
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "fail",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
            let message = read_guest_str(&mut caller, ptr, len)?;
            Err(GuestAbort(message).into())
        },
    )?;

    Ok(())
}
