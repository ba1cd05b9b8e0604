pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid specification: {message}")]
	InvalidSpecification { message: String },
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error(transparent)]
	Index(#[from] nest_storage::Error),
}
impl From<nest_domain::Error> for Error {
	fn from(err: nest_domain::Error) -> Self {
		match err {
			nest_domain::Error::InvalidSpecification(message) =>
				Self::InvalidSpecification { message },
			nest_domain::Error::InvalidArgument(message) => Self::InvalidArgument { message },
		}
	}
}
