#[derive(Debug, Clone, Copy)]
pub struct SourceMetadata<'a> {
    pub file_name: &'a str,
    pub contents: &'a str,
}
