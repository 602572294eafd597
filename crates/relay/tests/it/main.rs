mod mock;
mod relay;
