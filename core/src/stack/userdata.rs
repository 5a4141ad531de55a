/// A host type that can live in a full userdata slot.
///
/// The class name keys the type's metatable in the registry, see
/// [`Context::mt`](super::Context::mt).
pub trait UserData: 'static {
    const CLASS_NAME: &'static str;
}
