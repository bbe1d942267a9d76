//! Validation helpers for raw OCR frame text
//!
//! Camera frames arrive as noisy, untrusted text. These checks run before
//! a frame is handed to the similarity guard or the detector, so anything
//! rejected here is silently skipped rather than surfaced as an error to
//! the user mid-scan.

/// Validates a single OCR frame before it enters the detection pipeline.
///
/// # Arguments
/// * `text` - The raw text extracted from the camera frame
/// * `max_chars` - Maximum accepted frame length in characters
///
/// # Returns
/// * `Ok(&str)` - The trimmed frame text, ready for fingerprinting
/// * `Err(&'static str)` - A rejection reason key
///
/// Reason keys: `"frame-empty"`, `"frame-too-long"`, `"frame-control-chars"`.
///
/// # Examples
/// ```
/// use allergen_scanner::validation::validate_frame_text;
///
/// assert_eq!(validate_frame_text("  Susu, telur  ", 2000), Ok("Susu, telur"));
/// assert_eq!(validate_frame_text("   ", 2000), Err("frame-empty"));
/// assert_eq!(validate_frame_text("abcdef", 5), Err("frame-too-long"));
/// ```
pub fn validate_frame_text(text: &str, max_chars: usize) -> Result<&str, &'static str> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err("frame-empty");
    }

    // Character count, not bytes: OCR output is frequently multi-byte.
    if trimmed.chars().count() > max_chars {
        return Err("frame-too-long");
    }

    // Line breaks and tabs are normal in ingredient lists; anything else
    // in the control range means the OCR layer handed us garbage.
    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err("frame-control-chars");
    }

    Ok(trimmed)
}

/// Validates a product barcode before an online lookup.
///
/// # Returns
/// * `Ok(&str)` - The trimmed barcode
/// * `Err(&'static str)` - `"barcode-empty"`, `"barcode-too-long"` or
///   `"barcode-invalid-chars"`
///
/// # Examples
/// ```
/// use allergen_scanner::validation::validate_barcode;
///
/// assert_eq!(validate_barcode(" 8991002100015 "), Ok("8991002100015"));
/// assert_eq!(validate_barcode("12 34"), Err("barcode-invalid-chars"));
/// ```
pub fn validate_barcode(barcode: &str) -> Result<&str, &'static str> {
    const MAX_BARCODE_CHARS: usize = 32;

    let trimmed = barcode.trim();

    if trimmed.is_empty() {
        return Err("barcode-empty");
    }

    if trimmed.chars().count() > MAX_BARCODE_CHARS {
        return Err("barcode-too-long");
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("barcode-invalid-chars");
    }

    Ok(trimmed)
}
