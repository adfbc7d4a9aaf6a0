/// Type-erased error carried across layer boundaries where the concrete
/// error type of a collaborator is not part of the contract.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;
