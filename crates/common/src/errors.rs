//! Error chain helpers

mod private {
    use eyre::Chain;
    use std::error::Error;

    pub trait ErrorChain {
        fn chain(&self) -> Chain<'_>;
    }

    impl ErrorChain for dyn Error + 'static {
        fn chain(&self) -> Chain<'_> {
            Chain::new(self)
        }
    }

    impl ErrorChain for dyn Error + Send + Sync + 'static {
        fn chain(&self) -> Chain<'_> {
            Chain::new(self)
        }
    }

    impl ErrorChain for eyre::Report {
        fn chain(&self) -> Chain<'_> {
            self.chain()
        }
    }
}

/// Renders an error and all of its sources on a single line, separated by `; `.
pub fn display_chain<E: private::ErrorChain + ?Sized>(error: &E) -> String {
    dedup_chain(error).join("; ")
}

/// Collects the messages of an error chain, dropping a source whose message is already contained
/// in the message of the error that wraps it.
///
/// `relay unavailable: connection refused; connection refused` becomes
/// `relay unavailable: connection refused`.
pub fn dedup_chain<E: private::ErrorChain + ?Sized>(error: &E) -> Vec<String> {
    let mut causes: Vec<String> =
        error.chain().map(|cause| cause.to_string().trim().to_string()).collect();
    causes.dedup_by(|b, a| a.contains(b.as_str()));
    causes
}
