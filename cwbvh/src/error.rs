use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot build a BVH out of zero triangles")]
    EmptyInput,

    #[error("expected at least {expected} vertices, got {actual}")]
    NotEnoughVertices { expected: usize, actual: usize },

    #[error("vertex readback failed: {0}")]
    Transfer(String),

    #[error(
        "a CWBVH node would reference {triangles} triangles, more than the \
         format can address"
    )]
    LeafBudgetExceeded { triangles: usize },

    #[error(
        "CWBVH would be {depth} levels deep, more than the traversal stack \
         can handle"
    )]
    TooDeep { depth: usize },

    #[error("BVH #{handle} got destroyed before it could be uploaded")]
    HandleLost { handle: u32 },

    #[error("construction pipeline is already busy")]
    PipelineBusy,

    #[error("background build panicked")]
    BuildPanicked,
}
