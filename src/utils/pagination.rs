use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 分页参数 (page 从 1 开始)
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationParams {
    pub const DEFAULT_PER_PAGE: u64 = 50;
    pub const MAX_PER_PAGE: u64 = 200;

    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self { page, per_page }
    }

    pub fn get_page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn get_per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn get_offset(&self) -> u64 {
        // 数据库的 OFFSET 是有符号 64 位
        (self.get_page() - 1)
            .saturating_mul(self.get_per_page())
            .min(i64::MAX as u64)
    }

    pub fn info(&self, total: u64) -> PaginationInfo {
        PaginationInfo::new(self.get_page(), self.get_per_page(), total)
    }
}

impl PaginationInfo {
    pub fn new(current_page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            total.div_ceil(per_page)
        };

        Self {
            current_page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params() {
        let params = PaginationParams::new(Some(2), Some(10));
        assert_eq!(params.get_page(), 2);
        assert_eq!(params.get_per_page(), 10);
        assert_eq!(params.get_offset(), 10);

        // 超大页码不溢出
        let params = PaginationParams::new(Some(u64::MAX), Some(50));
        assert_eq!(params.get_offset(), i64::MAX as u64);
    }

    #[test]
    fn test_pagination_params_defaults() {
        let params = PaginationParams::new(None, Some(10_000));
        assert_eq!(params.get_page(), 1);
        assert_eq!(params.get_per_page(), PaginationParams::MAX_PER_PAGE);
        assert_eq!(params.get_offset(), 0);
    }

    #[test]
    fn test_pagination_info() {
        let info = PaginationParams::new(Some(2), Some(10)).info(25);
        assert_eq!(info.current_page, 2);
        assert_eq!(info.per_page, 10);
        assert_eq!(info.total, 25);
        assert_eq!(info.total_pages, 3);
        assert_eq!(PaginationInfo::new(1, 10, 0).total_pages, 1);
    }
}
