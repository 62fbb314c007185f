//! 通用工具函数

/// 清理DICOM字符串值：去掉尾部的空格和NUL填充
pub fn clean_dicom_text(value: &str) -> Option<String> {
    let trimmed = value.trim_end_matches(['\0', ' ']).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 验证DICOM UID格式
pub fn is_valid_dicom_uid(uid: &str) -> bool {
    !uid.is_empty() && uid.len() <= 64 && uid.chars().all(|c| c.is_ascii_digit() || c == '.')
}
