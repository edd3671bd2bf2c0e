/// Auto-implement [`From`], wrapping the source value in an enum variant.
#[macro_export]
macro_rules! impl_from {
    { for $type:ty ;
        $(
            $from:ty => $variant:path
        ),+
        $(,)*
    } => {
        $(
            impl From<$from> for $type {
                fn from(e: $from) -> $type {
                    $variant(e)
                }
            }
        )+
    };
}
