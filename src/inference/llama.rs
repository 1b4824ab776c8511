//! llama.cpp engine binding
//!
//! Loads GGUF models through `llama-cpp-2` and streams completions token by
//! token. A fresh context is created per generation so requests never share
//! KV cache state.

use std::num::NonZeroU32;
use std::path::Path;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;

use crate::inference::engine::{
    model_name_from_path, EngineCapability, EngineError, LoadParams, LoadedModel,
    SamplingParams, TokenStream,
};
use crate::inference::streaming::Utf8Assembler;

/// Tokens considered by the repetition penalty
const PENALTY_LAST_N: i32 = 64;

/// llama.cpp-backed engine
pub struct LlamaEngine {
    backend: Option<LlamaBackend>,
    model: Option<LlamaModel>,
    params: LoadParams,
    gpu_layers: u32,
}

impl LlamaEngine {
    pub fn new(gpu_layers: u32) -> Self {
        Self {
            backend: None,
            model: None,
            params: LoadParams::default(),
            gpu_layers,
        }
    }

    fn context_params(&self) -> LlamaContextParams {
        // llama.cpp keeps the KV cache in F16 and only computes logits for
        // tokens flagged in the batch, which covers f16_kv / logits_all.
        LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.params.context_size))
            .with_n_batch(self.params.context_size)
    }
}

impl EngineCapability for LlamaEngine {
    fn name(&self) -> &str {
        "llama.cpp"
    }

    fn load(&mut self, path: &Path, params: &LoadParams) -> Result<LoadedModel, EngineError> {
        if self.backend.is_none() {
            let mut backend =
                LlamaBackend::init().map_err(|e| EngineError::Backend(e.to_string()))?;
            if !params.verbose {
                backend.void_logs();
            }
            self.backend = Some(backend);
        }
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| EngineError::Backend("backend unavailable".to_string()))?;

        self.params = params.clone();
        let model_params = LlamaModelParams::default().with_n_gpu_layers(self.gpu_layers);
        let model = LlamaModel::load_from_file(backend, path, &model_params)
            .map_err(|e| EngineError::Load(e.to_string()))?;

        // Fail at load time if the context cannot be allocated
        model
            .new_context(backend, self.context_params())
            .map_err(|e| EngineError::Load(format!("context allocation failed: {e}")))?;

        let name = model
            .meta_val_str("general.name")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| model_name_from_path(path));

        tracing::info!(
            "Loaded {} ({} layers on GPU, context {})",
            name,
            self.gpu_layers,
            self.params.context_size
        );
        self.model = Some(model);
        Ok(LoadedModel { name })
    }

    fn generate<'a>(
        &'a self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<TokenStream<'a>, EngineError> {
        let (Some(backend), Some(model)) = (&self.backend, &self.model) else {
            return Err(EngineError::NotLoaded);
        };

        let mut ctx = model
            .new_context(backend, self.context_params())
            .map_err(|e| EngineError::Backend(e.to_string()))?;

        let tokens = model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| EngineError::Tokenize(e.to_string()))?;
        let n_ctx = ctx.n_ctx() as usize;
        if tokens.is_empty() || tokens.len() >= n_ctx {
            return Err(EngineError::Tokenize(format!(
                "prompt is {} tokens, context holds {}",
                tokens.len(),
                n_ctx
            )));
        }

        let mut batch = LlamaBatch::new(n_ctx, 1);
        let last = tokens.len() as i32 - 1;
        for (position, token) in (0_i32..).zip(tokens) {
            batch
                .add(token, position, &[0], position == last)
                .map_err(|e| EngineError::Decode(e.to_string()))?;
        }
        ctx.decode(&mut batch)
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        let sampler = LlamaSampler::chain_simple([
            LlamaSampler::penalties(PENALTY_LAST_N, params.repeat_penalty, 0.0, 0.0),
            LlamaSampler::top_k(params.top_k),
            LlamaSampler::top_p(params.top_p, 1),
            LlamaSampler::temp(params.temperature),
            LlamaSampler::dist(self.params.seed),
        ]);

        Ok(Box::new(LlamaStream {
            model,
            ctx,
            batch,
            sampler,
            position: last + 1,
            n_ctx: n_ctx as i32,
            remaining: params.max_tokens,
            utf8: Utf8Assembler::new(),
            done: false,
        }))
    }
}

/// Sampling loop over one context
struct LlamaStream<'a> {
    model: &'a LlamaModel,
    ctx: LlamaContext<'a>,
    batch: LlamaBatch,
    sampler: LlamaSampler,
    position: i32,
    n_ctx: i32,
    remaining: u32,
    utf8: Utf8Assembler,
    done: bool,
}

impl LlamaStream<'_> {
    fn finish(&mut self) -> Option<Result<String, EngineError>> {
        self.done = true;
        let tail = self.utf8.finish();
        (!tail.is_empty()).then_some(Ok(tail))
    }

    fn fail(&mut self, err: EngineError) -> Option<Result<String, EngineError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for LlamaStream<'_> {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.remaining == 0 || self.position >= self.n_ctx {
                return self.finish();
            }

            let token = self.sampler.sample(&self.ctx, self.batch.n_tokens() - 1);
            if self.model.is_eog_token(token) {
                return self.finish();
            }

            let bytes = match self.model.token_to_bytes(token, Special::Plaintext) {
                Ok(bytes) => bytes,
                Err(e) => return self.fail(EngineError::Generation(e.to_string())),
            };
            self.remaining -= 1;

            if self.remaining > 0 {
                self.batch.clear();
                if let Err(e) = self.batch.add(token, self.position, &[0], true) {
                    return self.fail(EngineError::Decode(e.to_string()));
                }
                self.position += 1;
                if let Err(e) = self.ctx.decode(&mut self.batch) {
                    return self.fail(EngineError::Decode(e.to_string()));
                }
            }

            let text = self.utf8.push(&bytes);
            if !text.is_empty() {
                return Some(Ok(text));
            }
        }
    }
}
