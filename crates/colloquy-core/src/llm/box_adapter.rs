//! BoxChatAdapter -- object-safe dynamic dispatch wrapper for ChatAdapter.
//!
//! 1. Define an object-safe `ChatAdapterDyn` trait with boxed futures
//! 2. Blanket-impl `ChatAdapterDyn` for all `T: ChatAdapter`
//! 3. `BoxChatAdapter` wraps `Box<dyn ChatAdapterDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use colloquy_types::error::AdapterError;

use super::adapter::{ChatAdapter, PromptRequest};

/// Object-safe version of [`ChatAdapter`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch; a blanket
/// implementation is provided for all types implementing `ChatAdapter`.
pub trait ChatAdapterDyn: Send + Sync {
    fn kind(&self) -> &'static str;

    fn call_boxed<'a>(
        &'a self,
        request: &'a PromptRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AdapterError>> + Send + 'a>>;
}

impl<T: ChatAdapter> ChatAdapterDyn for T {
    fn kind(&self) -> &'static str {
        ChatAdapter::kind(self)
    }

    fn call_boxed<'a>(
        &'a self,
        request: &'a PromptRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AdapterError>> + Send + 'a>> {
        Box::pin(ChatAdapter::call(self, request))
    }
}

/// Boxed adapter for heterogeneous storage in the registry.
pub struct BoxChatAdapter {
    inner: Box<dyn ChatAdapterDyn>,
}

impl BoxChatAdapter {
    pub fn new(adapter: impl ChatAdapter + 'static) -> Self {
        Self {
            inner: Box::new(adapter),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    pub async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        self.inner.call_boxed(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAdapter;

    impl ChatAdapter for EchoAdapter {
        fn kind(&self) -> &'static str {
            "echo"
        }

        async fn call(&self, request: &PromptRequest) -> Result<String, AdapterError> {
            Ok(request.system.clone())
        }
    }

    #[tokio::test]
    async fn test_box_adapter_delegates() {
        let boxed = BoxChatAdapter::new(EchoAdapter);
        assert_eq!(boxed.kind(), "echo");
        let request = PromptRequest {
            system: "sys".to_string(),
            messages: vec![],
        };
        assert_eq!(boxed.call(&request).await.unwrap(), "sys");
    }
}
