//! Element sink feeding the bulk processor

use std::marker::PhantomData;
use std::time::Instant;

use crate::action::WriteAction;
use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::processor::{BulkClient, BulkProcessor, FailureHandler, ProcessorStats};

/// Turns each element into zero or more write actions and batches them
pub struct ElasticsearchSink<T, C, F>
where
    C: BulkClient,
    F: Fn(&T) -> Vec<WriteAction>,
{
    processor: BulkProcessor<C>,
    transform: F,
    _element: PhantomData<fn(&T)>,
}

impl<T, C, F> ElasticsearchSink<T, C, F>
where
    C: BulkClient,
    F: Fn(&T) -> Vec<WriteAction>,
{
    pub fn new(config: SinkConfig, client: C, transform: F, handler: Box<dyn FailureHandler>) -> Self {
        Self {
            processor: BulkProcessor::new(client, config, handler),
            transform,
            _element: PhantomData,
        }
    }

    pub fn invoke(&mut self, element: &T) -> Result<(), SinkError> {
        for action in (self.transform)(element) {
            self.processor.add(action)?;
        }
        Ok(())
    }

    /// Periodic timer hook
    pub fn tick(&mut self) -> Result<(), SinkError> {
        self.processor.tick(Instant::now())
    }

    /// Checkpoint hook: all buffered actions are written before it returns
    pub fn snapshot(&mut self) -> Result<(), SinkError> {
        self.processor.checkpoint()
    }

    pub fn close(&mut self) -> Result<(), SinkError> {
        self.processor.close()
    }

    pub fn stats(&self) -> ProcessorStats {
        self.processor.stats()
    }

    pub fn processor(&self) -> &BulkProcessor<C> {
        &self.processor
    }
}
